//! Install file generation for the directory-server setup tool.

use std::path::Path;

use super::types::InstanceRecord;

/// Render the silent-install INF for `record`, rooted at `dir`.
pub fn render_install_inf(record: &InstanceRecord, dir: &Path) -> String {
    let path = dir.display();
    let InstanceRecord {
        name,
        host,
        port,
        base_dn,
        password,
        ..
    } = record;

    format!(
        "[General]
FullMachineName={host}
ServerRoot={path}
ConfigDirectoryAdminID=admin
ConfigDirectoryAdminPwd={password}

[slapd]
ServerPort={port}
ServerIdentifier={name}
Suffix={base_dn}
RootDN=cn=Directory Manager
RootDNPwd={password}
sysconfdir={path}/etc
localstatedir={path}/var
inst_dir={path}/slapd-{name}
config_dir={path}/etc/dirsrv/slapd-{name}
datadir={path}/usr/share
initconfig_dir={path}
run_dir={path}/run
sbin_dir={path}
db_dir={path}/db
ldif_dir={path}/ldif
bak_dir={path}/bak
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_identity_and_layout() {
        let record = InstanceRecord {
            name: "alice4200".to_string(),
            user: "alice".to_string(),
            host: "ldap.local".to_string(),
            port: 4200,
            base_dn: "dc=example,dc=com".to_string(),
            password: "pw".to_string(),
        };
        let inf = render_install_inf(&record, Path::new("/srv/ldap/alice4200"));
        let lines: Vec<&str> = inf.lines().collect();

        assert_eq!(lines[0], "[General]");
        for expected in [
            "FullMachineName=ldap.local",
            "ServerRoot=/srv/ldap/alice4200",
            "ConfigDirectoryAdminPwd=pw",
            "ServerPort=4200",
            "ServerIdentifier=alice4200",
            "Suffix=dc=example,dc=com",
            "RootDNPwd=pw",
            "inst_dir=/srv/ldap/alice4200/slapd-alice4200",
            "config_dir=/srv/ldap/alice4200/etc/dirsrv/slapd-alice4200",
            "bak_dir=/srv/ldap/alice4200/bak",
        ] {
            assert!(lines.contains(&expected), "missing {expected}");
        }
    }
}
