//! Metadata extractors: pure functions from a track path to metadata.
//!
//! An extractor must be total. When it finds nothing it returns an empty
//! [`Metadata`] map rather than failing. Extractors registered on a
//! [`HubBuilder`](crate::builder::HubBuilder) run in registration order, later
//! ones overwriting keys set by earlier ones.

use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::{error::TrackHubError, track::Metadata};

type ExtractorFn = dyn Fn(&Path) -> Metadata + Send + Sync;

/// A named, cloneable metadata extractor.
///
/// Two extractors are equal only if they share the same underlying function
/// (i.e. one is a clone of the other).
#[derive(Clone)]
pub struct MetadataExtractor {
    name: String,
    func: Arc<ExtractorFn>,
}

impl MetadataExtractor {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Path) -> Metadata + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extract(&self, path: &Path) -> Metadata {
        (self.func)(path)
    }
}

impl PartialEq for MetadataExtractor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for MetadataExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataExtractor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn path_parts(path: &Path) -> Vec<String> {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect()
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn split_stem(stem: &str) -> Vec<&str> {
    stem.split(&['.', '_'][..]).collect()
}

/// The assay directory: the one after `seqnado_output`, or else the fourth
/// component from the end.
fn seqnado_assay(parts: &[String]) -> Option<String> {
    if let Some(i) = parts
        .iter()
        .position(|part| part.eq_ignore_ascii_case("seqnado_output"))
    {
        return parts.get(i + 1).cloned();
    }
    parts.len().checked_sub(4).map(|i| parts[i].clone())
}

/// Extract metadata from seqnado output paths, laid out as
/// `.../seqnado_output/{assay}/{file_type}/{method}/{norm}/{sample}.bigWig`.
///
/// Keys: `assay`, `norm`, `method`, `file_type`, `samplename`, plus
/// `viewpoint` for MCC and `strand` for RNA, both taken from the last
/// `_`/`.`-separated piece of the file stem. Paths too shallow for the layout
/// give an empty map.
pub fn from_seqnado_path() -> MetadataExtractor {
    MetadataExtractor::new("seqnado", |path: &Path| {
        let mut metadata = Metadata::new();
        let parts = path_parts(path);
        if parts.len() < 4 {
            return metadata;
        }
        let Some(assay) = seqnado_assay(&parts) else {
            return metadata;
        };
        let n = parts.len();
        let file_stem = stem(path);
        let pieces = split_stem(&file_stem);

        metadata.insert("assay".to_string(), assay.clone());
        metadata.insert("norm".to_string(), parts[n - 2].clone());
        metadata.insert("method".to_string(), parts[n - 3].clone());
        metadata.insert("file_type".to_string(), parts[n - 4].clone());
        metadata.insert("samplename".to_string(), pieces[0].to_string());

        let last = pieces.last().copied().unwrap_or_default().to_string();
        match assay.as_str() {
            "MCC" => {
                metadata.insert("viewpoint".to_string(), last);
            }
            "RNA" => {
                metadata.insert("strand".to_string(), last);
            }
            _ => {}
        }
        metadata
    })
}

/// Build an extractor from a regular expression with named capture groups,
/// matched against the file name. No match gives an empty map.
pub fn from_filename_pattern(pattern: &str) -> Result<MetadataExtractor, TrackHubError> {
    let regex = Regex::new(pattern)?;
    let name = format!("pattern:{}", pattern);
    Ok(MetadataExtractor::new(name, move |path: &Path| {
        let mut metadata = Metadata::new();
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Some(captures) = regex.captures(&file_name) {
            for group in regex.capture_names().flatten() {
                if let Some(value) = captures.name(group) {
                    metadata.insert(group.to_string(), value.as_str().to_string());
                }
            }
        }
        metadata
    }))
}

/// Extract parent directory names, up to `depth` levels up. Level `i` (from 0,
/// the immediate parent) is stored under `names[i]`, or `dir_{i+1}`.
pub fn from_parent_dirs(depth: usize, names: Vec<String>) -> MetadataExtractor {
    MetadataExtractor::new(format!("parent_dirs:{}", depth), move |path: &Path| {
        let mut metadata = Metadata::new();
        let mut current = path.parent();
        for i in 0..depth {
            let Some(dir) = current else { break };
            let Some(dir_name) = dir.file_name() else {
                break;
            };
            let key = names
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("dir_{}", i + 1));
            metadata.insert(key, dir_name.to_string_lossy().to_string());
            current = dir.parent();
        }
        metadata
    })
}

/// Combine extractors into one. With `overwrite`, later extractors win on
/// shared keys; without it, the first value set is kept.
pub fn compose(extractors: Vec<MetadataExtractor>, overwrite: bool) -> MetadataExtractor {
    let name = extractors
        .iter()
        .map(|e| e.name())
        .collect::<Vec<_>>()
        .join("+");
    MetadataExtractor::new(name, move |path: &Path| {
        let mut metadata = Metadata::new();
        for extractor in &extractors {
            for (key, value) in extractor.extract(path) {
                if overwrite {
                    metadata.insert(key, value);
                } else {
                    metadata.entry(key).or_insert(value);
                }
            }
        }
        metadata
    })
}

/// An extractor returning the same key/value pairs for every path.
pub fn with_static_metadata<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> MetadataExtractor
where
    K: Into<String>,
    V: Into<String>,
{
    let metadata: Metadata = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    MetadataExtractor::new("static", move |_: &Path| metadata.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_seqnado_path() {
        let path = PathBuf::from("/tmp/x/ATAC/ATAC_Tn5/CPM/sample1.bigWig");
        let metadata = from_seqnado_path().extract(&path);
        assert_eq!(metadata["assay"], "ATAC");
        assert_eq!(metadata["method"], "ATAC_Tn5");
        assert_eq!(metadata["norm"], "CPM");
        assert_eq!(metadata["file_type"], "ATAC");
        assert_eq!(metadata["samplename"], "sample1");
    }

    #[test]
    fn test_from_seqnado_path_output_dir() {
        let path = PathBuf::from("/data/seqnado_output/atac/bigwigs/atac_tn5/cpm/s1.plus.bigWig");
        let metadata = from_seqnado_path().extract(&path);
        assert_eq!(metadata["assay"], "atac");
        assert_eq!(metadata["file_type"], "bigwigs");
        assert_eq!(metadata["samplename"], "s1");
    }

    #[test]
    fn test_from_seqnado_path_mcc() {
        let path =
            PathBuf::from("/data/seqnado_output/MCC/bigwigs/mcc/replicates/sample1_view1.bigWig");
        let metadata = from_seqnado_path().extract(&path);
        assert_eq!(metadata["assay"], "MCC");
        assert_eq!(metadata["viewpoint"], "view1");
    }

    #[test]
    fn test_from_seqnado_path_rna() {
        let path = PathBuf::from("/data/seqnado_output/RNA/bigwigs/STAR/CPM/sample1_plus.bigWig");
        let metadata = from_seqnado_path().extract(&path);
        assert_eq!(metadata["assay"], "RNA");
        assert_eq!(metadata["strand"], "plus");
        assert!(!metadata.contains_key("viewpoint"));
    }

    #[test]
    fn test_from_seqnado_path_too_shallow() {
        let metadata = from_seqnado_path().extract(Path::new("a/b.bw"));
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_from_filename_pattern() {
        let extractor =
            from_filename_pattern(r"(?P<sample>.+?)_(?P<mark>.+?)_(?P<rep>.+)\.").unwrap();
        let metadata = extractor.extract(Path::new("/x/SAMPLE_CTCF_R1.bigWig"));
        assert_eq!(metadata["sample"], "SAMPLE");
        assert_eq!(metadata["mark"], "CTCF");
        assert_eq!(metadata["rep"], "R1");
    }

    #[test]
    fn test_from_filename_pattern_no_match() {
        let extractor = from_filename_pattern(r"(?P<sample>.+?)_(?P<mark>.+?)\.bam").unwrap();
        assert!(extractor.extract(Path::new("SAMPLE_CTCF_R1.bigWig")).is_empty());
    }

    #[test]
    fn test_from_filename_pattern_invalid_regex() {
        assert!(matches!(
            from_filename_pattern("(?P<open"),
            Err(TrackHubError::RegexError(_))
        ));
    }

    #[test]
    fn test_from_parent_dirs() {
        let path = Path::new("/tmp/ATAC/ATAC_Tn5/CPM/sample1.bigWig");
        let extractor = from_parent_dirs(2, vec!["norm".to_string(), "method".to_string()]);
        let metadata = extractor.extract(path);
        assert_eq!(metadata["norm"], "CPM");
        assert_eq!(metadata["method"], "ATAC_Tn5");

        let metadata = from_parent_dirs(3, vec![]).extract(path);
        assert_eq!(metadata["dir_3"], "ATAC");
    }

    #[test]
    fn test_from_parent_dirs_stops_at_root() {
        let metadata = from_parent_dirs(5, vec![]).extract(Path::new("/top/file.bw"));
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata["dir_1"], "top");
    }

    #[test]
    fn test_compose_no_overwrite() {
        let path = Path::new("K562_CTCF.bigWig");
        let e1 = with_static_metadata([("sample", "DEFAULT"), ("assay", "ATAC")]);
        let e2 = from_filename_pattern(r"(?P<sample>.+?)_(?P<mark>.+?)\.").unwrap();
        let metadata = compose(vec![e1, e2], false).extract(path);
        assert_eq!(metadata["sample"], "DEFAULT");
        assert_eq!(metadata["assay"], "ATAC");
        assert_eq!(metadata["mark"], "CTCF");
    }

    #[test]
    fn test_compose_with_overwrite() {
        let path = Path::new("K562_CTCF.bigWig");
        let e1 = with_static_metadata([("sample", "DEFAULT")]);
        let e2 = from_filename_pattern(r"(?P<sample>.+?)_(?P<mark>.+?)\.").unwrap();
        let metadata = compose(vec![e1, e2], true).extract(path);
        assert_eq!(metadata["sample"], "K562");
        assert_eq!(metadata["mark"], "CTCF");
    }

    #[test]
    fn test_extractor_identity() {
        let a = with_static_metadata([("k", "v")]);
        let b = with_static_metadata([("k", "v")]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
