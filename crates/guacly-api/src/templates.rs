// Payload templates.
//
// The `user` .. `sharing_profile` templates list the keys each create
// request must carry (nested maps may be partial). `rdp_connection` and
// `organizational_group` are complete starting points for callers.

use serde_json::{Value, json};

/// Required keys for `POST .../users`.
pub fn user() -> Value {
    json!({
        "username": "",
        "password": "",
        "attributes": {
            "disabled": "",
            "expired": "",
            "access-window-start": "",
            "access-window-end": "",
            "valid-from": "",
            "valid-until": "",
            "timezone": null,
            "guac-full-name": "",
            "guac-organization": "",
            "guac-organizational-role": ""
        }
    })
}

/// Required keys for `POST .../userGroups`.
pub fn user_group() -> Value {
    json!({
        "identifier": "",
        "attributes": {
            "disabled": ""
        }
    })
}

/// Required keys for `POST .../connections`.
pub fn connection() -> Value {
    json!({
        "parentIdentifier": "ROOT",
        "name": "",
        "protocol": "",
        "parameters": {},
        "attributes": {}
    })
}

/// Required keys for `POST .../connectionGroups`.
pub fn connection_group() -> Value {
    json!({
        "parentIdentifier": "ROOT",
        "name": "",
        "type": "ORGANIZATIONAL",
        "attributes": {
            "max-connections": "",
            "max-connections-per-user": ""
        }
    })
}

/// Required keys for `POST .../sharingProfiles`.
pub fn sharing_profile() -> Value {
    json!({
        "name": "",
        "primaryConnectionIdentifier": "",
        "parameters": { "read-only": "" },
        "attributes": {}
    })
}

/// A complete RDP connection payload under ROOT.
pub fn rdp_connection() -> Value {
    json!({
        "name": "",
        "identifier": "",
        "parentIdentifier": "ROOT",
        "protocol": "rdp",
        "attributes": {
            "max-connections": "",
            "max-connections-per-user": ""
        },
        "activeConnections": 0,
        "parameters": {
            "disable-audio": "",
            "server-layout": "",
            "domain": "",
            "hostname": "",
            "enable-font-smoothing": "",
            "security": "rdp",
            "port": "3389",
            "disable-auth": "",
            "ignore-cert": "",
            "console": "",
            "width": "",
            "height": "",
            "dpi": "",
            "color-depth": "",
            "console-audio": "",
            "enable-printing": "",
            "enable-drive": "",
            "create-drive-path": "",
            "enable-wallpaper": "",
            "enable-theming": "",
            "enable-full-window-drag": "",
            "enable-desktop-composition": "",
            "enable-menu-animations": "",
            "preconnection-id": "",
            "enable-sftp": "",
            "sftp-port": ""
        }
    })
}

/// A complete organizational connection-group payload.
pub fn organizational_group(name: &str, parent_identifier: &str) -> Value {
    json!({
        "parentIdentifier": parent_identifier,
        "name": name,
        "type": "ORGANIZATIONAL",
        "attributes": {
            "max-connections": "",
            "max-connections-per-user": ""
        }
    })
}
