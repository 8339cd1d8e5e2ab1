use crate::config::Layout;

/// Generate the systemd unit file content.
pub fn systemd_unit(exec_start: &str, working_directory: &str) -> String {
    format!(
        r"[Unit]
Description=tuic Service
Documentation=https://github.com/EAimTY/tuic
After=network.target nss-lookup.target

[Service]
Type=simple
User=root
CapabilityBoundingSet=CAP_NET_ADMIN CAP_NET_BIND_SERVICE CAP_NET_RAW
AmbientCapabilities=CAP_NET_ADMIN CAP_NET_BIND_SERVICE CAP_NET_RAW
ExecStart={exec_start}
Restart=on-failure
LimitNPROC=512
LimitNOFILE=infinity
WorkingDirectory={working_directory}

[Install]
WantedBy=multi-user.target
"
    )
}

/// Unit content for a layout.
pub fn relay_unit(layout: &Layout) -> String {
    systemd_unit(
        &layout.exec_start(),
        &layout.workstation.display().to_string(),
    )
}
