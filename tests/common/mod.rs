//! Scripted stand-in for lvs/lvcreate/lvremove/mount/umount/findmnt.
//!
//! Keeps a tiny in-memory volume group and mount table, applies the
//! mutating commands to it and records every invocation.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use lvsnap::{CmdOutput, CommandRunner, Lvm, LvmError, LvsnapConfig};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("lvsnaptest-{prefix}-{pid}-{t}-{id}"))
}

/// Fresh existing directory to use as a mount point.
pub fn mount_dir(prefix: &str) -> PathBuf {
    let d = unique_root(prefix);
    fs::create_dir_all(&d).expect("create mount dir");
    d
}

#[derive(Debug, Clone)]
pub struct FakeLv {
    pub name: String,
    pub size: u64,
    pub roles: Vec<String>,
    pub host: String,
    pub origin: String,
    pub snap_percent: String,
}

#[derive(Default)]
struct State {
    vg: String,
    lvs: Vec<FakeLv>,
    // (device, target)
    mounts: Vec<(String, String)>,
    calls: Vec<Vec<String>>,
    fail_next: HashMap<String, (i32, String)>,
    fail_always: HashMap<String, (i32, String)>,
}

/// Clones share one state; hand one to `Lvm`, keep one for assertions.
#[derive(Clone)]
pub struct FakeLvm {
    state: Rc<RefCell<State>>,
}

fn ok(stdout: String) -> CmdOutput {
    CmdOutput {
        code: Some(0),
        stdout,
        stderr: String::new(),
    }
}

fn fail(code: i32, stderr: &str) -> CmdOutput {
    CmdOutput {
        code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

fn opt<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    let prefix = format!("{key}=");
    args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))
}

impl FakeLvm {
    pub fn new(vg: &str) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                vg: vg.to_string(),
                ..State::default()
            })),
        }
    }

    /// Handle wired to this fake with the default tool paths.
    pub fn lvm(&self) -> Lvm {
        Lvm::with_runner(LvsnapConfig::default(), Rc::new(self.clone()))
    }

    pub fn dm_path(&self, name: &str) -> String {
        format!("/dev/mapper/{}-{}", self.state.borrow().vg, name)
    }

    pub fn add_lv(&self, name: &str, size: u64) {
        self.state.borrow_mut().lvs.push(FakeLv {
            name: name.to_string(),
            size,
            roles: vec!["public".to_string()],
            host: "dbhost".to_string(),
            origin: String::new(),
            snap_percent: String::new(),
        });
    }

    pub fn add_mount(&self, device: &str, target: &Path) {
        self.state
            .borrow_mut()
            .mounts
            .push((device.to_string(), target.display().to_string()));
    }

    pub fn set_snap_percent(&self, name: &str, p: &str) {
        let mut st = self.state.borrow_mut();
        if let Some(lv) = st.lvs.iter_mut().find(|l| l.name == name) {
            lv.snap_percent = p.to_string();
        }
    }

    /// Next call of `program` (basename) exits with `code`.
    pub fn fail_next(&self, program: &str, code: i32, stderr: &str) {
        self.state
            .borrow_mut()
            .fail_next
            .insert(program.to_string(), (code, stderr.to_string()));
    }

    pub fn fail_always(&self, program: &str, code: i32, stderr: &str) {
        self.state
            .borrow_mut()
            .fail_always
            .insert(program.to_string(), (code, stderr.to_string()));
    }

    pub fn heal(&self, program: &str) {
        let mut st = self.state.borrow_mut();
        st.fail_always.remove(program);
        st.fail_next.remove(program);
    }

    pub fn has_lv(&self, name: &str) -> bool {
        self.state.borrow().lvs.iter().any(|l| l.name == name)
    }

    pub fn is_mounted(&self, device: &str) -> bool {
        self.state.borrow().mounts.iter().any(|(d, _)| d == device)
    }

    /// Every call as `[program, args...]`.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.borrow().calls.clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c[0] == program)
            .map(|mut c| {
                c.remove(0);
                c
            })
            .collect()
    }

    /// Programs of the mutating calls in order (lookups filtered out).
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c[0].clone())
            .filter(|p| p != "lvs" && p != "findmnt")
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    fn render_lvs(st: &State) -> String {
        let rows: Vec<serde_json::Value> = st
            .lvs
            .iter()
            .map(|l| {
                serde_json::json!({
                    "vg_name": st.vg,
                    "lv_name": l.name,
                    "lv_full_name": format!("{}/{}", st.vg, l.name),
                    "lv_size": l.size.to_string(),
                    "lv_dm_path": format!("/dev/mapper/{}-{}", st.vg, l.name),
                    "lv_role": l.roles.join(","),
                    "lv_host": l.host,
                    "origin": l.origin,
                    "snap_percent": l.snap_percent,
                })
            })
            .collect();
        serde_json::json!({ "report": [ { "lv": rows } ] }).to_string()
    }

    fn handle(&self, program: &str, args: &[String]) -> CmdOutput {
        let mut st = self.state.borrow_mut();
        match program {
            "lvs" => ok(Self::render_lvs(&st)),
            "findmnt" => {
                let hit = if let Some(src) = opt(args, "--source") {
                    st.mounts.iter().find(|(d, _)| d == src).map(|(_, t)| t.clone())
                } else if let Some(mp) = opt(args, "--mountpoint") {
                    st.mounts.iter().find(|(_, t)| t == mp).map(|(d, _)| d.clone())
                } else {
                    return fail(2, "findmnt: bad usage");
                };
                let header = if opt(args, "--output") == Some("target") {
                    "TARGET"
                } else {
                    "SOURCE"
                };
                match hit {
                    Some(v) => ok(format!("{header}\n{v}\n")),
                    None => fail(1, ""),
                }
            }
            "mount" => {
                let (Some(src), Some(tgt)) = (opt(args, "--source"), opt(args, "--target")) else {
                    return fail(1, "mount: bad usage");
                };
                let known = st
                    .lvs
                    .iter()
                    .any(|l| format!("/dev/mapper/{}-{}", st.vg, l.name) == src);
                if !known {
                    return fail(32, "mount: special device does not exist");
                }
                if st.mounts.iter().any(|(d, t)| d == src || t == tgt) {
                    return fail(32, "mount: already mounted or mount point busy");
                }
                st.mounts.push((src.to_string(), tgt.to_string()));
                ok(String::new())
            }
            "umount" => {
                let dev = args.last().cloned().unwrap_or_default();
                match st.mounts.iter().position(|(d, _)| *d == dev) {
                    Some(i) => {
                        st.mounts.remove(i);
                        ok(String::new())
                    }
                    None => fail(32, "umount: not mounted"),
                }
            }
            "lvcreate" => {
                let name = opt(args, "--name").unwrap_or_default().to_string();
                let origin_full = args.last().cloned().unwrap_or_default();
                let origin = origin_full
                    .strip_prefix(&format!("{}/", st.vg))
                    .unwrap_or(&origin_full)
                    .to_string();
                if st.lvs.iter().any(|l| l.name == name) {
                    return fail(5, "Logical Volume already exists in volume group");
                }
                let Some(o) = st.lvs.iter_mut().find(|l| l.name == origin) else {
                    return fail(5, "Failed to find logical volume");
                };
                if !o.roles.iter().any(|r| r == "origin") {
                    o.roles.push("origin".to_string());
                }
                st.lvs.push(FakeLv {
                    name,
                    size: 1 << 30,
                    roles: vec!["public".to_string(), "snapshot".to_string()],
                    host: "dbhost".to_string(),
                    origin,
                    snap_percent: "0.00".to_string(),
                });
                ok(String::new())
            }
            "lvremove" => {
                let full = args.last().cloned().unwrap_or_default();
                let name = full
                    .strip_prefix(&format!("{}/", st.vg))
                    .unwrap_or(&full)
                    .to_string();
                let dev = format!("/dev/mapper/{}-{}", st.vg, name);
                if st.mounts.iter().any(|(d, _)| *d == dev) {
                    return fail(5, "Logical volume contains a filesystem in use");
                }
                match st.lvs.iter().position(|l| l.name == name) {
                    Some(i) => {
                        st.lvs.remove(i);
                        ok(String::new())
                    }
                    None => fail(5, "Failed to find logical volume"),
                }
            }
            other => fail(127, &format!("{other}: command not found")),
        }
    }
}

impl CommandRunner for FakeLvm {
    fn run(&self, program: &Path, args: &[String]) -> Result<CmdOutput, LvmError> {
        let prog = program
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        {
            let mut st = self.state.borrow_mut();
            let mut call = vec![prog.clone()];
            call.extend(args.iter().cloned());
            st.calls.push(call);
            if let Some((code, err)) = st.fail_next.remove(&prog) {
                return Ok(fail(code, &err));
            }
            if let Some((code, err)) = st.fail_always.get(&prog) {
                return Ok(fail(*code, err));
            }
        }
        Ok(self.handle(&prog, args))
    }
}
