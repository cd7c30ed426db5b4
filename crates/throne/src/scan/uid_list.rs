#![forbid(unsafe_code)]

use crate::domain::{Uid, UidRecord, valid_package_name};
use crate::error::Error;
use std::path::Path;
use tracing::{debug, warn};

/// Read the precomputed uid list maintained by the external scanner
/// helper: one `<uid> <package>` record per line. The file is consumed
/// into memory whole; a zero-size or entry-less file is an error so the
/// caller can fall back to the slower directory walk.
pub fn read_uid_list(path: &Path) -> Result<Vec<UidRecord>, Error> {
    let meta = std::fs::metadata(path)?;
    if meta.len() == 0 {
        return Err(Error::UidListEmpty {
            path: path.to_owned(),
        });
    }

    let text = std::fs::read_to_string(path)?;
    let mut records = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((uid_str, package)) = line.split_once(char::is_whitespace) else {
            warn!(line, "uid list: missing package field");
            continue;
        };
        let package = package.trim();
        if package.is_empty() {
            continue;
        }
        let Ok(uid) = uid_str.parse::<libc::uid_t>() else {
            warn!(uid = uid_str, "uid list: bad uid");
            continue;
        };
        if !valid_package_name(package) {
            warn!(package, "uid list: implausible package name");
            continue;
        }
        records.push(UidRecord::new(Uid::new(uid), package));
    }

    if records.is_empty() {
        return Err(Error::UidListNoEntries {
            path: path.to_owned(),
        });
    }
    debug!(count = records.len(), "loaded uid list");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn parses_records_and_skips_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uid_list");
        std::fs::write(
            &path,
            "10001 com.example.app\n\n  10002\tcom.example.other  \nnot-a-uid com.bad\n10003\n",
        )
        .unwrap();

        let records = read_uid_list(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], UidRecord::new(Uid::new(10_001), "com.example.app"));
        assert_eq!(
            records[1],
            UidRecord::new(Uid::new(10_002), "com.example.other")
        );
    }

    #[test]
    fn empty_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uid_list");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            read_uid_list(&path),
            Err(Error::UidListEmpty { .. })
        ));
    }

    #[test]
    fn garbage_only_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uid_list");
        std::fs::write(&path, "###\nnope\n").unwrap();
        assert!(matches!(
            read_uid_list(&path),
            Err(Error::UidListNoEntries { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_uid_list(&dir.path().join("absent")),
            Err(Error::Io(_))
        ));
    }

    proptest! {
        #[test]
        fn never_panics_on_line_soup(lines in prop::collection::vec("[ -~]{0,40}", 1..20)) {
            let dir = tempdir().unwrap();
            let path = dir.path().join("uid_list");
            std::fs::write(&path, lines.join("\n")).unwrap();

            if let Ok(records) = read_uid_list(&path) {
                prop_assert!(!records.is_empty());
                for record in records {
                    prop_assert!(valid_package_name(&record.package));
                }
            }
        }
    }
}
