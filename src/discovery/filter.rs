use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{Discovery, WorkItem};
use crate::config::ConversionConfig;
use crate::error::PipelineError;

/// Finds input files and maps each onto its mirrored output path
///
/// Read-only: the filter never touches the output tree beyond existence
/// checks.
#[derive(Debug, Clone)]
pub struct PathFilter {
    input_root: PathBuf,
    output_root: PathBuf,
    source_extension: String,
    target_extension: String,
    case_insensitive: bool,
    follow_symlinks: bool,
    exclude: Vec<String>,
}

impl PathFilter {
    pub fn new(
        input_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        config: &ConversionConfig,
    ) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            source_extension: normalize_extension(&config.source_extension),
            target_extension: normalize_extension(&config.target_extension),
            case_insensitive: config.case_insensitive,
            follow_symlinks: config.follow_symlinks,
            exclude: config.exclude.clone(),
        }
    }

    /// Every matching input under the root, converted or not
    ///
    /// The sequence is lazy; its order is whatever the walk yields.
    pub fn candidates(&self) -> Result<impl Iterator<Item = WorkItem> + '_, PipelineError> {
        self.check_root()?;
        let walker = self.build_walker()?;

        Ok(walker.filter_map(move |entry| match entry {
            Ok(entry) => {
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    return None;
                }
                self.mirror(entry.path())
            }
            Err(err) => {
                tracing::warn!("Error walking input tree: {}", err);
                None
            }
        }))
    }

    /// Matching inputs whose output does not exist yet
    pub fn pending(&self) -> Result<impl Iterator<Item = WorkItem> + '_, PipelineError> {
        Ok(self.candidates()?.filter(|item| !item.output().exists()))
    }

    /// Walk the whole tree and materialize the pending items
    pub fn scan(&self) -> Result<Discovery, PipelineError> {
        let mut discovery = Discovery::default();
        let mut seen_outputs = HashSet::new();

        for item in self.candidates()? {
            discovery.candidates += 1;

            if item.output().exists() {
                discovery.already_converted += 1;
                continue;
            }

            if !seen_outputs.insert(item.output().to_path_buf()) {
                tracing::warn!(
                    "Skipping {}: another input already maps to {}",
                    item.input().display(),
                    item.output().display()
                );
                discovery.duplicates += 1;
                continue;
            }

            discovery.items.push(item);
        }

        tracing::info!(
            "Discovered {} candidates ({} pending, {} already converted)",
            discovery.candidates,
            discovery.items.len(),
            discovery.already_converted
        );

        Ok(discovery)
    }

    /// Compute the output path for an input, if the input matches
    pub fn mirror(&self, input: &Path) -> Option<WorkItem> {
        if !self.matches_extension(input) {
            return None;
        }

        let relative = input.strip_prefix(&self.input_root).ok()?;
        let output = self
            .output_root
            .join(relative)
            .with_extension(&self.target_extension);

        Some(WorkItem::new(input, output))
    }

    fn matches_extension(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };

        if self.case_insensitive {
            extension.eq_ignore_ascii_case(&self.source_extension)
        } else {
            extension == self.source_extension
        }
    }

    fn check_root(&self) -> Result<(), PipelineError> {
        let metadata = fs::metadata(&self.input_root).map_err(|source| PipelineError::Discovery {
            path: self.input_root.clone(),
            source,
        })?;

        if !metadata.is_dir() {
            return Err(PipelineError::NotADirectory(self.input_root.clone()));
        }

        // Metadata succeeds on unreadable directories, listing does not
        fs::read_dir(&self.input_root).map_err(|source| PipelineError::Discovery {
            path: self.input_root.clone(),
            source,
        })?;

        Ok(())
    }

    fn build_walker(&self) -> Result<ignore::Walk, PipelineError> {
        let mut builder = WalkBuilder::new(&self.input_root);
        builder
            .standard_filters(false) // Convert hidden and git-ignored files too
            .follow_links(self.follow_symlinks);

        if !self.exclude.is_empty() {
            let mut overrides = OverrideBuilder::new(&self.input_root);
            for pattern in &self.exclude {
                overrides
                    .add(&format!("!{pattern}"))
                    .map_err(|source| PipelineError::InvalidExclude {
                        pattern: pattern.clone(),
                        source,
                    })?;
            }
            let overrides = overrides.build().map_err(|source| PipelineError::InvalidExclude {
                pattern: self.exclude.join(","),
                source,
            })?;
            builder.overrides(overrides);
        }

        // Never feed our own output back in when it lives under the input root
        if let Some(nested_output) = self.nested_output_root() {
            tracing::debug!("Not walking output tree {}", nested_output.display());
            builder.filter_entry(move |entry| entry.path() != nested_output);
        }

        Ok(builder.build())
    }

    /// The output root spelled the way the walker reports paths, if it lies
    /// strictly inside the input root
    ///
    /// Both roots are resolved first so `.` and `out`, or `data/../data` and
    /// `data/out`, are recognized as nested.
    fn nested_output_root(&self) -> Option<PathBuf> {
        let input = fs::canonicalize(&self.input_root).ok()?;
        let output = resolve_path(&self.output_root)?;
        if output == input {
            return None;
        }

        let relative = output.strip_prefix(&input).ok()?;
        Some(self.input_root.join(relative))
    }
}

/// Canonicalize `path`, allowing its trailing components not to exist yet
fn resolve_path(path: &Path) -> Option<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };

    let mut missing = Vec::new();
    let mut existing = absolute.as_path();
    loop {
        if let Ok(mut resolved) = fs::canonicalize(existing) {
            resolved.extend(missing.iter().rev());
            return Some(resolved);
        }
        missing.push(existing.file_name()?);
        existing = existing.parent()?;
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(source: &str, target: &str) -> ConversionConfig {
        ConversionConfig {
            source_extension: source.to_string(),
            target_extension: target.to_string(),
            ..ConversionConfig::default()
        }
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}").unwrap();
    }

    #[test]
    fn test_mirror_replaces_root_and_extension() {
        let filter = PathFilter::new("/data/in", "/data/out", &config(".svg", "png"));

        let item = filter.mirror(Path::new("/data/in/sub/sub2/c.svg")).unwrap();
        assert_eq!(item.output(), Path::new("/data/out/sub/sub2/c.png"));

        // Only the last extension is replaced
        let item = filter.mirror(Path::new("/data/in/icon.v2.svg")).unwrap();
        assert_eq!(item.output(), Path::new("/data/out/icon.v2.png"));

        assert!(filter.mirror(Path::new("/data/in/readme.md")).is_none());
        assert!(filter.mirror(Path::new("/data/in/svg")).is_none());
    }

    #[test]
    fn test_extension_case_handling() {
        let exact = PathFilter::new("/in", "/out", &config("svg", "png"));
        assert!(exact.mirror(Path::new("/in/A.SVG")).is_none());

        let mut relaxed = config("svg", "png");
        relaxed.case_insensitive = true;
        let relaxed = PathFilter::new("/in", "/out", &relaxed);
        let item = relaxed.mirror(Path::new("/in/A.SVG")).unwrap();
        assert_eq!(item.output(), Path::new("/out/A.png"));
    }

    #[test]
    fn test_scan_skips_existing_outputs() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        touch(input.path(), "a.json");
        touch(input.path(), "sub/b.json");
        touch(input.path(), "sub/notes.txt");
        touch(output.path(), "a.yaml");

        let filter = PathFilter::new(input.path(), output.path(), &config("json", "yaml"));
        let discovery = filter.scan().unwrap();

        assert_eq!(discovery.candidates, 2);
        assert_eq!(discovery.already_converted, 1);
        assert_eq!(discovery.items.len(), 1);
        assert_eq!(discovery.items[0].input(), input.path().join("sub/b.json"));
        assert_eq!(discovery.items[0].output(), output.path().join("sub/b.yaml"));

        let pending: Vec<_> = filter.pending().unwrap().collect();
        assert_eq!(pending, discovery.items);
    }

    #[test]
    fn test_scan_includes_hidden_files() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        touch(input.path(), ".hidden/a.json");
        fs::write(input.path().join(".gitignore"), "*.json\n").unwrap();

        let filter = PathFilter::new(input.path(), output.path(), &config("json", "yaml"));
        assert_eq!(filter.scan().unwrap().items.len(), 1);
    }

    #[test]
    fn test_exclude_patterns() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        touch(input.path(), "keep.json");
        touch(input.path(), "vendor/skip.json");

        let mut cfg = config("json", "yaml");
        cfg.exclude = vec!["vendor/**".to_string()];
        let filter = PathFilter::new(input.path(), output.path(), &cfg);
        let discovery = filter.scan().unwrap();

        assert_eq!(discovery.items.len(), 1);
        assert!(discovery.items[0].input().ends_with("keep.json"));
    }

    #[test]
    fn test_output_root_inside_input_root_is_not_walked() {
        let input = TempDir::new().unwrap();
        touch(input.path(), "a.json");
        touch(input.path(), "out/old.json");

        let filter = PathFilter::new(input.path(), input.path().join("out"), &config("json", "json"));
        let discovery = filter.scan().unwrap();

        assert_eq!(discovery.items.len(), 1);
        assert_eq!(discovery.items[0].output(), input.path().join("out/a.json"));
    }

    #[test]
    fn test_nested_output_root_spelled_differently_is_not_walked() {
        let input = TempDir::new().unwrap();
        touch(input.path(), "a.json");
        touch(input.path(), "out/a.json");
        fs::create_dir_all(input.path().join("sub")).unwrap();

        // Same directory as `<input>/out`, reached through a sibling
        let output = input.path().join("sub/../out");
        let filter = PathFilter::new(input.path(), &output, &config("json", "json"));
        let discovery = filter.scan().unwrap();

        assert_eq!(discovery.candidates, 1);
        assert_eq!(discovery.already_converted, 1);
        assert!(discovery.items.is_empty());
    }

    #[test]
    fn test_missing_nested_output_root_is_still_recognized() {
        let input = TempDir::new().unwrap();
        touch(input.path(), "a.json");
        fs::create_dir_all(input.path().join("sub")).unwrap();

        let filter = PathFilter::new(
            input.path().join("sub/.."),
            input.path().join("out/converted"),
            &config("json", "json"),
        );
        assert_eq!(
            filter.nested_output_root(),
            Some(input.path().join("sub/..").join("out/converted"))
        );
    }

    #[test]
    fn test_output_root_equal_to_input_root_is_walked() {
        let input = TempDir::new().unwrap();
        touch(input.path(), "a.json");

        let filter = PathFilter::new(input.path(), input.path(), &config("json", "yaml"));
        assert_eq!(filter.nested_output_root(), None);
        assert_eq!(filter.scan().unwrap().items.len(), 1);
    }

    #[test]
    fn test_resolve_path_keeps_missing_tail() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_path(&dir.path().join("a/b")).unwrap();
        assert_eq!(resolved, fs::canonicalize(dir.path()).unwrap().join("a/b"));
    }

    #[test]
    fn test_case_insensitive_duplicates_dispatch_once() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        touch(input.path(), "a.json");
        touch(input.path(), "a.JSON");

        let mut cfg = config("json", "yaml");
        cfg.case_insensitive = true;
        let discovery = PathFilter::new(input.path(), output.path(), &cfg).scan().unwrap();

        assert_eq!(discovery.candidates, 2);
        assert_eq!(discovery.items.len(), 1);
        assert_eq!(discovery.duplicates, 1);
    }

    #[test]
    fn test_missing_root_is_a_discovery_error() {
        let output = TempDir::new().unwrap();
        let filter = PathFilter::new("/definitely/not/here", output.path(), &config("json", "yaml"));
        assert!(matches!(filter.scan(), Err(PipelineError::Discovery { .. })));
    }

    #[test]
    fn test_file_root_is_rejected() {
        let input = TempDir::new().unwrap();
        touch(input.path(), "a.json");
        let filter = PathFilter::new(input.path().join("a.json"), "/out", &config("json", "yaml"));
        assert!(matches!(filter.scan(), Err(PipelineError::NotADirectory(_))));
    }
}
