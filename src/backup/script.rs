use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, VaultError};

pub const REMOTE_BACKUP_DIR_PARAM: &str = "RemoteBackupDir";
pub const REMOTE_SCRIPT_NAME: &str = "ghettovcb.sh";

/// Substitutes `$name` and `${name}` placeholders; `$$` yields `$`.
/// Unknown or malformed placeholders are copied through untouched.
pub fn render_template(template: &str, params: &BTreeMap<&str, &str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }
        if let Some(braced) = after.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                let name = &braced[..end];
                if is_identifier(name) {
                    if let Some(value) = params.get(name) {
                        out.push_str(value);
                        rest = &braced[end + 1..];
                        continue;
                    }
                }
            }
            out.push('$');
            rest = after;
            continue;
        }
        let len = identifier_len(after);
        match params.get(&after[..len]) {
            Some(value) if len > 0 => {
                out.push_str(value);
                rest = &after[len..];
            }
            _ => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Renders the backup script template into a temporary file with LF endings.
pub fn render_script(template_path: &Path, remote_backup_dir: &str) -> Result<NamedTempFile> {
    let template = fs::read_to_string(template_path).map_err(|e| {
        VaultError::message(format!("read template {}: {}", template_path.display(), e))
    })?;
    let params = BTreeMap::from([(REMOTE_BACKUP_DIR_PARAM, remote_backup_dir)]);
    let rendered = render_template(&template, &params).replace("\r\n", "\n");
    let mut file = tempfile::Builder::new()
        .prefix("ghettovcb-")
        .suffix(".sh")
        .tempfile()?;
    file.write_all(rendered.as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn identifier_len(s: &str) -> usize {
    let mut len = 0;
    for (i, c) in s.char_indices() {
        let ok = c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit());
        if !ok {
            break;
        }
        len = i + c.len_utf8();
    }
    len
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && identifier_len(s) == s.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([(REMOTE_BACKUP_DIR_PARAM, "/vmfs/volumes/Backup-LUN/BackupsDir")])
    }

    #[test]
    fn substitutes_plain_and_braced() {
        let out = render_template(
            "VM_BACKUP_VOLUME=$RemoteBackupDir\nLOG=${RemoteBackupDir}/log\n",
            &params(),
        );
        assert_eq!(
            out,
            "VM_BACKUP_VOLUME=/vmfs/volumes/Backup-LUN/BackupsDir\nLOG=/vmfs/volumes/Backup-LUN/BackupsDir/log\n"
        );
    }

    #[test]
    fn leaves_shell_variables_alone() {
        let tmpl = "echo $HOME ${PATH} $1 $$ ${RemoteBackupDirX} $ {x} $";
        assert_eq!(
            render_template(tmpl, &params()),
            "echo $HOME ${PATH} $1 $ ${RemoteBackupDirX} $ {x} $"
        );
    }

    #[test]
    fn longest_identifier_is_used() {
        assert_eq!(render_template("$RemoteBackupDirs", &params()), "$RemoteBackupDirs");
        assert_eq!(
            render_template("$RemoteBackupDir/x", &params()),
            "/vmfs/volumes/Backup-LUN/BackupsDir/x"
        );
    }

    #[test]
    fn render_script_writes_temp_file() {
        let mut template = NamedTempFile::new().expect("tempfile");
        template
            .write_all(b"#!/bin/sh\r\nVM_BACKUP_VOLUME=${RemoteBackupDir}\r\n")
            .expect("write");
        let script = render_script(template.path(), "/backups").expect("render");
        let contents = fs::read_to_string(script.path()).expect("read");
        assert_eq!(contents, "#!/bin/sh\nVM_BACKUP_VOLUME=/backups\n");
    }
}
