//! Runtime resource composition
//!
//! Turns the declaration's GPU request and env file into container-level
//! resource limits, pod annotations, and environment variables.

use std::collections::BTreeMap;
use std::path::Path;

use crate::declaration::{GpuSpec, ProjectDeclaration};
use crate::error::{Error, Result};
use crate::k8s::EnvVar;

/// Annotation key carrying the requested MIG profile
pub const GPU_ANNOTATION: &str = "gpu";

/// Composed runtime resources for one job
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComposedResources {
    /// Container resource limits
    pub limits: BTreeMap<String, i64>,
    /// Pod template annotations
    pub annotations: BTreeMap<String, String>,
    /// Container environment, sorted by name
    pub env: Vec<EnvVar>,
}

/// Compose limits, annotations, and env from a declaration.
///
/// A whole-device count requests `nvidia.com/gpu`; a MIG profile requests
/// one `nvidia.com/mig-<profile>` partition and records the profile as a
/// pod annotation. A count of zero requests nothing.
pub fn compose(declaration: &ProjectDeclaration) -> Result<ComposedResources> {
    validate_os_dependencies(declaration)?;

    let mut composed = ComposedResources::default();

    if let Some(gpu) = &declaration.gpu {
        gpu.validate()?;
        match gpu {
            GpuSpec::Count(0) => {}
            GpuSpec::Count(count) => {
                composed
                    .limits
                    .insert("nvidia.com/gpu".to_string(), i64::from(*count));
            }
            GpuSpec::MigProfile(profile) => {
                composed
                    .limits
                    .insert(format!("nvidia.com/mig-{profile}"), 1);
                composed
                    .annotations
                    .insert(GPU_ANNOTATION.to_string(), profile.clone());
            }
        }
    }

    if let Some(env_file) = &declaration.env_file {
        let path = declaration.root.join(env_file);
        if !path.exists() {
            return Err(Error::not_found(path));
        }
        let variables = parse_env_file(&path)?;
        composed.env = variables
            .into_iter()
            .map(|(name, value)| EnvVar::literal(name, value))
            .collect();
    }

    Ok(composed)
}

/// Check that declared OS dependencies look like plain package names.
pub fn validate_os_dependencies(declaration: &ProjectDeclaration) -> Result<()> {
    for dep in &declaration.os_dependencies {
        let plain = !dep.is_empty()
            && !dep
                .chars()
                .any(|c| c.is_whitespace() || c == '/' || c == '\\');
        if !plain {
            return Err(Error::validation(format!(
                "os dependency {dep:?} is not a plain package name"
            )));
        }
    }
    Ok(())
}

/// Parse a dotenv-style file into a sorted map.
///
/// Blank lines and `#` comments are skipped, a leading `export ` is
/// stripped case-insensitively, and a value wrapped in matching single
/// or double quotes loses the quotes. Later assignments to the same key
/// win.
pub fn parse_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let contents = std::fs::read_to_string(path)?;
    let mut variables = BTreeMap::new();

    for (idx, raw) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = match line.get(..7) {
            Some(prefix) if prefix.eq_ignore_ascii_case("export ") => line[7..].trim_start(),
            _ => line,
        };
        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::parse(path, line_no, "missing '='"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::parse(path, line_no, "missing key"));
        }
        let value = strip_matching_quotes(value.trim());
        variables.insert(key.to_string(), value.to_string());
    }

    Ok(variables)
}

/// Strip one layer of matching quotes, if present.
fn strip_matching_quotes(value: &str) -> &str {
    let mut chars = value.chars();
    match chars.next() {
        Some(quote @ ('\'' | '"')) if value.ends_with(quote) => {
            if value.len() == 1 {
                ""
            } else {
                &value[1..value.len() - 1]
            }
        }
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::*;

    fn make_declaration(gpu: Option<GpuSpec>) -> ProjectDeclaration {
        ProjectDeclaration {
            name: "demo".to_string(),
            root: PathBuf::from("/tmp/demo"),
            entrypoint: "python run.py".to_string(),
            os_dependencies: Vec::new(),
            inputs: Vec::new(),
            env_file: None,
            gpu,
            storage: None,
        }
    }

    fn write_env_file(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(".env");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn no_gpu_composes_nothing() {
        let composed = compose(&make_declaration(None)).unwrap();
        assert!(composed.limits.is_empty());
        assert!(composed.annotations.is_empty());
        assert!(composed.env.is_empty());
    }

    #[test]
    fn zero_count_composes_nothing() {
        let composed = compose(&make_declaration(Some(GpuSpec::Count(0)))).unwrap();
        assert!(composed.limits.is_empty());
        assert!(composed.annotations.is_empty());
    }

    #[test]
    fn whole_device_count_sets_the_gpu_limit() {
        let composed = compose(&make_declaration(Some(GpuSpec::Count(2)))).unwrap();
        assert_eq!(composed.limits.get("nvidia.com/gpu"), Some(&2));
        assert!(composed.annotations.is_empty());
    }

    #[test]
    fn mig_profile_sets_partition_limit_and_annotation() {
        let spec = GpuSpec::MigProfile("1g.10gb".to_string());
        let composed = compose(&make_declaration(Some(spec))).unwrap();
        assert_eq!(composed.limits.get("nvidia.com/mig-1g.10gb"), Some(&1));
        assert_eq!(
            composed.annotations.get(GPU_ANNOTATION),
            Some(&"1g.10gb".to_string())
        );
    }

    #[test]
    fn blank_mig_profile_is_rejected() {
        let spec = GpuSpec::MigProfile("   ".to_string());
        assert!(compose(&make_declaration(Some(spec))).is_err());
    }

    #[test]
    fn os_dependency_with_whitespace_is_rejected() {
        let mut declaration = make_declaration(None);
        declaration.os_dependencies = vec!["curl && rm".to_string()];
        let err = compose(&declaration).unwrap_err();
        assert!(err.to_string().contains("plain package name"));
    }

    #[test]
    fn os_dependency_with_path_separator_is_rejected() {
        let mut declaration = make_declaration(None);
        declaration.os_dependencies = vec!["../etc/passwd".to_string()];
        assert!(compose(&declaration).is_err());
    }

    #[test]
    fn plain_os_dependencies_pass() {
        let mut declaration = make_declaration(None);
        declaration.os_dependencies = vec!["ffmpeg".to_string(), "libgl1".to_string()];
        assert!(compose(&declaration).is_ok());
    }

    #[test]
    fn missing_env_file_is_a_not_found_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut declaration = make_declaration(None);
        declaration.root = dir.path().to_path_buf();
        declaration.env_file = Some(PathBuf::from("absent.env"));
        let err = compose(&declaration).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn env_vars_arrive_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        write_env_file(dir.path(), "ZEBRA=z\nALPHA=a\nMIDDLE=m\n");
        let mut declaration = make_declaration(None);
        declaration.root = dir.path().to_path_buf();
        declaration.env_file = Some(PathBuf::from(".env"));
        let composed = compose(&declaration).unwrap();
        let names: Vec<&str> = composed.env.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["ALPHA", "MIDDLE", "ZEBRA"]);
    }

    #[test]
    fn parse_skips_blanks_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(dir.path(), "\n# comment\n  \nKEY=value\n");
        let parsed = parse_env_file(&path).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("KEY"), Some(&"value".to_string()));
    }

    #[test]
    fn parse_strips_export_prefix_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(dir.path(), "export A=1\nEXPORT B=2\nExPoRt C=3\n");
        let parsed = parse_env_file(&path).unwrap();
        assert_eq!(parsed.get("A"), Some(&"1".to_string()));
        assert_eq!(parsed.get("B"), Some(&"2".to_string()));
        assert_eq!(parsed.get("C"), Some(&"3".to_string()));
    }

    #[test]
    fn parse_keeps_equals_signs_in_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(dir.path(), "URL=postgres://u:p@host/db?sslmode=on\n");
        let parsed = parse_env_file(&path).unwrap();
        assert_eq!(
            parsed.get("URL"),
            Some(&"postgres://u:p@host/db?sslmode=on".to_string())
        );
    }

    #[test]
    fn parse_strips_matching_quotes_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(
            dir.path(),
            "A=\"quoted\"\nB='single'\nC=\"mismatch'\nD=\"\n",
        );
        let parsed = parse_env_file(&path).unwrap();
        assert_eq!(parsed.get("A"), Some(&"quoted".to_string()));
        assert_eq!(parsed.get("B"), Some(&"single".to_string()));
        assert_eq!(parsed.get("C"), Some(&"\"mismatch'".to_string()));
        assert_eq!(parsed.get("D"), Some(&String::new()));
    }

    #[test]
    fn parse_reports_line_numbers_for_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(dir.path(), "GOOD=1\nnot an assignment\n");
        let err = parse_env_file(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(err.to_string().contains("missing '='"));
    }

    #[test]
    fn parse_rejects_a_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(dir.path(), "=value\n");
        let err = parse_env_file(&path).unwrap_err();
        assert!(err.to_string().contains("missing key"));
    }

    #[test]
    fn parse_last_assignment_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(dir.path(), "KEY=first\nKEY=second\n");
        let parsed = parse_env_file(&path).unwrap();
        assert_eq!(parsed.get("KEY"), Some(&"second".to_string()));
    }
}
