use crate::cli::AssignArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use smirkff::core::forcefield::handlers::HandlerKind;
use smirkff::engine::config as core_config;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings file for `smirkff assign`. Command-line flags override every value.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub forcefields: Option<Vec<PathBuf>>,
    pub assignment: Option<FileAssignmentConfig>,
    pub output: Option<FileOutputConfig>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileAssignmentConfig {
    pub handlers: Option<Vec<String>>,
    pub enforce_coverage: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOutputConfig {
    pub toml: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading configuration file {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: FileConfig =
            toml::from_str(&content).map_err(|e| CliError::FileParsing {
                path: path.to_path_buf(),
                source: e.into(),
            })?;

        // Document paths in the file are relative to the file itself.
        if let (Some(paths), Some(base)) = (config.forcefields.as_mut(), path.parent()) {
            for p in paths.iter_mut().filter(|p| p.is_relative()) {
                *p = base.join(&*p);
            }
        }
        Ok(config)
    }
}

pub struct AppConfig {
    pub topology_path: PathBuf,
    pub toml_output: Option<PathBuf>,
    pub csv_output: Option<PathBuf>,
    pub core_config: core_config::AssignmentConfig,
}

pub fn build_config(args: &AssignArgs) -> Result<AppConfig> {
    let file_config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let forcefields = if args.forcefields.is_empty() {
        file_config.forcefields.take().unwrap_or_default()
    } else {
        args.forcefields.clone()
    };
    for path in &forcefields {
        if !path.exists() {
            return Err(CliError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Force field document does not exist: {}", path.display()),
            )));
        }
    }

    let assignment = file_config.assignment.take().unwrap_or_default();
    let handler_names = if args.handlers.is_empty() {
        assignment.handlers.unwrap_or_default()
    } else {
        args.handlers.clone()
    };
    let handlers = parse_selection(&handler_names)?;
    let enforce_coverage = !args.allow_uncovered && assignment.enforce_coverage.unwrap_or(true);

    let output = file_config.output.take().unwrap_or_default();

    let core_config = core_config::AssignmentConfigBuilder::new()
        .forcefield_paths(forcefields)
        .handlers(handlers)
        .enforce_coverage(enforce_coverage)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        topology_path: args.topology.clone(),
        toml_output: args.output.clone().or(output.toml),
        csv_output: args.csv.clone().or(output.csv),
        core_config,
    })
}

fn parse_selection(names: &[String]) -> Result<core_config::HandlerSelection> {
    if names.is_empty() {
        return Ok(core_config::HandlerSelection::All);
    }
    let kinds = names
        .iter()
        .map(|name| name.parse::<HandlerKind>().map_err(CliError::Argument))
        .collect::<Result<Vec<_>>>()?;
    Ok(core_config::HandlerSelection::Only(kinds))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "assignment.enforce-coverage" => {
                config
                    .assignment
                    .get_or_insert_with(Default::default)
                    .enforce_coverage = Some(value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid boolean value for {}: {}", key, value_str))
                })?);
            }
            "assignment.handlers" => {
                config.assignment.get_or_insert_with(Default::default).handlers = Some(
                    value_str
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect(),
                );
            }
            "output.toml" => {
                config.output.get_or_insert_with(Default::default).toml =
                    Some(PathBuf::from(value_str));
            }
            "output.csv" => {
                config.output.get_or_insert_with(Default::default).csv =
                    Some(PathBuf::from(value_str));
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn base_args(topology: PathBuf) -> AssignArgs {
        AssignArgs {
            topology,
            forcefields: Vec::new(),
            config: None,
            output: None,
            csv: None,
            handlers: Vec::new(),
            allow_uncovered: false,
            set_values: Vec::new(),
        }
    }

    #[test]
    fn file_values_are_used_and_paths_resolved_relative_to_the_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ff.toml"), "version = \"0.3\"").unwrap();
        let cfg_path = dir.path().join("config.toml");
        fs::write(
            &cfg_path,
            r#"
            forcefields = ["ff.toml"]
            [assignment]
            handlers = ["Bonds", "vdW"]
            enforce-coverage = false
            [output]
            csv = "out.csv"
            "#,
        )
        .unwrap();

        let mut args = base_args(dir.path().join("mol.toml"));
        args.config = Some(cfg_path);
        let app = build_config(&args).unwrap();

        assert_eq!(
            app.core_config.forcefield_paths,
            vec![dir.path().join("ff.toml")]
        );
        assert_eq!(
            app.core_config.handlers,
            core_config::HandlerSelection::Only(vec![HandlerKind::Bonds, HandlerKind::Vdw])
        );
        assert!(!app.core_config.enforce_coverage);
        assert_eq!(app.csv_output, Some(PathBuf::from("out.csv")));
        assert_eq!(app.toml_output, None);
    }

    #[test]
    fn cli_overrides_file_values() {
        let dir = tempdir().unwrap();
        let ff = dir.path().join("ff.toml");
        let other = dir.path().join("other.toml");
        fs::write(&ff, "version = \"0.3\"").unwrap();
        fs::write(&other, "version = \"0.3\"").unwrap();
        let cfg_path = dir.path().join("config.toml");
        fs::write(&cfg_path, "forcefields = [\"ff.toml\"]\n[output]\ntoml = \"a.toml\"\n").unwrap();

        let mut args = base_args(dir.path().join("mol.toml"));
        args.config = Some(cfg_path);
        args.forcefields = vec![other.clone()];
        args.output = Some(PathBuf::from("b.toml"));
        args.allow_uncovered = true;
        let app = build_config(&args).unwrap();

        assert_eq!(app.core_config.forcefield_paths, vec![other]);
        assert_eq!(app.toml_output, Some(PathBuf::from("b.toml")));
        assert!(!app.core_config.enforce_coverage);
    }

    #[test]
    fn set_values_override() {
        let dir = tempdir().unwrap();
        let ff = dir.path().join("ff.toml");
        fs::write(&ff, "version = \"0.3\"").unwrap();
        let mut args = base_args(dir.path().join("mol.toml"));
        args.forcefields = vec![ff];
        args.set_values = vec![
            "assignment.enforce-coverage=false".to_string(),
            "assignment.handlers=Angles, ProperTorsions".to_string(),
        ];
        let app = build_config(&args).unwrap();
        assert!(!app.core_config.enforce_coverage);
        assert_eq!(
            app.core_config.handlers,
            core_config::HandlerSelection::Only(vec![
                HandlerKind::Angles,
                HandlerKind::ProperTorsions
            ])
        );

        args.set_values = vec!["assignment.cutoff=9".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
        args.set_values = vec!["no-equals-sign".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn missing_inputs_are_reported() {
        let dir = tempdir().unwrap();
        let args = base_args(dir.path().join("mol.toml"));
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        let mut args = base_args(dir.path().join("mol.toml"));
        args.forcefields = vec![dir.path().join("absent.toml")];
        assert!(matches!(build_config(&args), Err(CliError::Io(_))));

        let mut args = base_args(dir.path().join("mol.toml"));
        fs::write(dir.path().join("ff.toml"), "").unwrap();
        args.forcefields = vec![dir.path().join("ff.toml")];
        args.handlers = vec!["Dihedrals".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Argument(_))));
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        fs::write(&cfg_path, "threads = 4\n").unwrap();
        assert!(matches!(
            FileConfig::from_file(&cfg_path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
