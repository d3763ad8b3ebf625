use std::path::{Component, Path, PathBuf};

/// Join `requested` onto `report_dir`, refusing anything that could leave the report directory.
///
/// Only plain path segments (and `.`) are accepted. Absolute paths, `..` and drive prefixes are
/// rejected outright instead of being normalised.
pub(crate) fn resolve_report_file(report_dir: &Path, requested: &str) -> Option<PathBuf> {
    let mut resolved = report_dir.to_path_buf();
    let mut has_segment = false;

    for component in Path::new(requested).components() {
        match component {
            Component::Normal(segment) => {
                resolved.push(segment);
                has_segment = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    has_segment.then_some(resolved)
}

pub(crate) fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        _ => "text/html",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_file_is_resolved() {
        assert_eq!(
            Some(PathBuf::from("/reports/run-1/js/stats.js")),
            resolve_report_file(Path::new("/reports/run-1"), "js/stats.js")
        );
    }

    #[test]
    fn current_dir_segments_are_ignored() {
        assert_eq!(
            Some(PathBuf::from("/reports/run-1/index.html")),
            resolve_report_file(Path::new("/reports/run-1"), "./index.html")
        );
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let report_dir = Path::new("/reports/run-1");
        assert_eq!(None, resolve_report_file(report_dir, "../run-0/index.html"));
        assert_eq!(None, resolve_report_file(report_dir, "js/../../secret"));
        assert_eq!(None, resolve_report_file(report_dir, "/etc/passwd"));
    }

    #[test]
    fn empty_request_is_rejected() {
        assert_eq!(None, resolve_report_file(Path::new("/reports/run-1"), ""));
        assert_eq!(None, resolve_report_file(Path::new("/reports/run-1"), "."));
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!("text/css", content_type_for(Path::new("style/style.css")));
        assert_eq!("application/javascript", content_type_for(Path::new("js/all.js")));
        assert_eq!("application/json", content_type_for(Path::new("js/stats.json")));
        assert_eq!("image/png", content_type_for(Path::new("style/logo.png")));
        assert_eq!("text/html", content_type_for(Path::new("index.html")));
        assert_eq!("text/html", content_type_for(Path::new("simulation.log")));
    }
}
