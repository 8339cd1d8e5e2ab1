//! In-memory fakes for the host seams.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::cmd::{CmdOutput, Runner};
use crate::config::Layout;
use crate::net::Network;
use crate::port::PortProbe;

/// Records every command line and replays scripted outputs.
///
/// Commands without a script succeed with empty output. When several outputs
/// are scripted for one command they are replayed in order and the last one
/// repeats.
#[derive(Debug, Default)]
pub struct FakeRunner {
    calls: RefCell<Vec<String>>,
    scripts: RefCell<HashMap<String, VecDeque<CmdOutput>>>,
    missing: HashSet<String>,
    effects: HashMap<String, Vec<PathBuf>>,
    spawn_errors: HashSet<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(self, cmd_line: &str, output: CmdOutput) -> Self {
        self.scripts
            .borrow_mut()
            .entry(cmd_line.to_string())
            .or_default()
            .push_back(output);
        self
    }

    pub fn with_stdout(self, cmd_line: &str, stdout: &str) -> Self {
        self.script(
            cmd_line,
            CmdOutput {
                success: true,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    pub fn fail(self, cmd_line: &str, stderr: &str) -> Self {
        self.script(
            cmd_line,
            CmdOutput {
                success: false,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Make `cmd_line` fail to spawn, as a missing binary does.
    pub fn spawn_error(mut self, cmd_line: &str) -> Self {
        self.spawn_errors.insert(cmd_line.to_string());
        self
    }

    pub fn missing(mut self, program: &str) -> Self {
        self.missing.insert(program.to_string());
        self
    }

    /// Create an empty file at `path` whenever `cmd_line` runs.
    pub fn creates(mut self, cmd_line: &str, path: &Path) -> Self {
        self.effects
            .entry(cmd_line.to_string())
            .or_default()
            .push(path.to_path_buf());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, cmd_line: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == cmd_line).count()
    }

    pub fn ran_program(&self, program: &str) -> bool {
        let prefix = format!("{program} ");
        self.calls.borrow().iter().any(|c| c.starts_with(&prefix))
    }
}

impl Runner for FakeRunner {
    fn output(&self, program: &str, args: &[&str]) -> Result<CmdOutput> {
        let cmd_line = format!("{program} {}", args.join(" "));
        self.calls.borrow_mut().push(cmd_line.clone());
        if self.spawn_errors.contains(&cmd_line) {
            bail!("failed to execute: {cmd_line}");
        }
        for path in self.effects.get(&cmd_line).into_iter().flatten() {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(path, "")?;
        }
        let mut scripts = self.scripts.borrow_mut();
        let Some(queue) = scripts.get_mut(&cmd_line) else {
            return Ok(CmdOutput {
                success: true,
                ..CmdOutput::default()
            });
        };
        let output = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(output.unwrap_or_default())
    }

    fn stream(&self, program: &str, args: &[&str]) -> Result<()> {
        self.output(program, args).map(|_| ())
    }

    fn exists(&self, program: &str) -> bool {
        !self.missing.contains(program)
    }
}

/// Scripted DNS, public IP and download responses.
#[derive(Debug)]
pub struct FakeNetwork {
    pub resolved: Vec<IpAddr>,
    pub public_ip: IpAddr,
    pub binary: Vec<u8>,
    pub calls: Cell<usize>,
}

impl FakeNetwork {
    pub fn new(resolved: &str, public_ip: &str) -> Self {
        Self {
            resolved: vec![resolved.parse().unwrap_or(IpAddr::from([0, 0, 0, 0]))],
            public_ip: public_ip.parse().unwrap_or(IpAddr::from([0, 0, 0, 0])),
            binary: b"#!/bin/sh\necho tuic-server 1.0.0\n".to_vec(),
            calls: Cell::new(0),
        }
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl Network for FakeNetwork {
    fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>> {
        self.tick();
        if domain.is_empty() {
            bail!("empty domain");
        }
        Ok(self.resolved.clone())
    }

    fn public_ip(&self) -> Result<IpAddr> {
        self.tick();
        Ok(self.public_ip)
    }

    fn download(&self, _url: &str) -> Result<Vec<u8>> {
        self.tick();
        Ok(self.binary.clone())
    }
}

/// Port probe with a fixed set of occupied ports.
#[derive(Debug, Default)]
pub struct FakeProbe {
    pub busy_udp: HashSet<u16>,
    pub busy_tcp: HashSet<u16>,
    pub probes: Cell<usize>,
}

impl FakeProbe {
    pub fn free() -> Self {
        Self::default()
    }
}

impl PortProbe for FakeProbe {
    fn udp_free(&self, port: u16) -> bool {
        self.probes.set(self.probes.get() + 1);
        !self.busy_udp.contains(&port)
    }

    fn tcp_free(&self, port: u16) -> bool {
        self.probes.set(self.probes.get() + 1);
        !self.busy_tcp.contains(&port)
    }
}

/// Layout rooted entirely inside `root`.
pub fn temp_layout(root: &Path) -> Layout {
    let mut layout = Layout::new(root.join("tuic-server"));
    layout.unit_path = root.join("systemd").join("tuic.service");
    layout.letsencrypt = root.join("letsencrypt");
    layout.shell_rc_files = vec![root.join(".bashrc"), root.join(".bash_aliases")];
    layout.alias_command = "/usr/local/bin/tunic".into();
    layout
}
