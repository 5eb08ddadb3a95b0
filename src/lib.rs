// Базовые модули
pub mod config;
pub mod error;
pub mod exec;
pub mod metrics;
pub mod lock;
pub mod interrupt;

// Сервисы: каталог томов (lvs) и таблица монтирования (findmnt)
pub mod lvs;
pub mod mounts;

// Тома, снапшоты, сессии
pub mod volume;
pub mod snapshot;
pub mod session;

// Бэкап из примонтированного снапшота
pub mod backup;

pub mod cli;

// Удобные реэкспорты
pub use config::LvsnapConfig;
pub use error::{ErrorKind, LvmError};
pub use exec::{CmdOutput, CommandRunner, Lvm, SystemRunner};
pub use interrupt::{Interrupt, Interrupted};
pub use lvs::{find_lv, list_lvs, VolumeRecord};
pub use mounts::{find_mount_source, find_mount_target, MountLookup};
pub use session::{with_snapshot, SessionError, SnapshotSession};
pub use snapshot::{remove_snapshot, CowSnapshot, OriginRef, SizeSpec, SnapshotMode};
pub use volume::{LogicalVolume, VolumeState};
