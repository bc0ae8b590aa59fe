use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, hardware::Hardware};

/// What a caller asks to open: a port identifier and a baud rate.
///
/// Immutable once validated. Either both fields are accepted by the
/// hardware layer, or initialization fails; there is no partially open
/// state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortConfig {
    /// The port identifier, e.g. `tty0` or `/dev/ttyACM0`.
    pub port: String,

    /// The baud rate, e.g. `115200`.
    pub baud: u32,
}

impl PortConfig {
    /// Convenience constructor.
    pub fn new<S: Into<String>>(port: S, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
        }
    }
}

/// Witness that a [`PortConfig`] passed validation against a hardware layer.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedConfig(pub(crate) PortConfig);

/// Check `config` against what `hardware` enumerates.
pub(crate) fn validate(
    hardware: &dyn Hardware,
    config: &PortConfig,
) -> Result<ValidatedConfig, ConfigError> {
    if !hardware.available_ports().iter().any(|p| p == &config.port) {
        return Err(ConfigError::UnknownPort(config.port.clone()));
    }

    if !hardware.supported_bauds().contains(&config.baud) {
        return Err(ConfigError::UnsupportedBaud(config.baud));
    }

    Ok(ValidatedConfig(config.clone()))
}

/// Describes a bench: which ports exist and which baud rates they accept.
///
/// Used by [`crate::mock::MockHardware`], and loadable from a RON file so
/// a test setup can be described next to the tests using it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Bench {
    /// The ports the bench exposes.
    pub ports: Vec<String>,

    /// The baud rates the bench accepts.
    pub bauds: Vec<u32>,
}

impl Bench {
    fn ron() -> ron::Options {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .with_default_extension(ron::extensions::Extensions::UNWRAP_NEWTYPES)
    }

    /// An example bench: two ports and the common baud rates.
    pub fn example() -> Self {
        Self {
            ports: vec!["tty0".into(), "tty1".into()],
            bauds: vec![9_600, 19_200, 38_400, 57_600, 115_200],
        }
    }

    /// Deserialize a .ron file's contents.
    pub fn deserialize(input: &str) -> Result<Self, ConfigError> {
        Self::ron()
            .from_str(input)
            .map_err(|e| ConfigError::BadBench(format!("Not valid RON: {e}")))
    }

    /// Serialize the bench in a "pretty" (i.e. non-compact) fashion.
    pub fn serialize_pretty(&self) -> String {
        Self::ron()
            .to_string_pretty(self, ron::ser::PrettyConfig::default())
            .unwrap()
    }

    /// Set up a bench from a RON file.
    pub fn new_from_path<P: AsRef<Path>>(p: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(p)
            .map_err(|e| ConfigError::BadBench(format!("Could not read the bench file: {e}")))?;

        let bench = Self::deserialize(&contents)?;
        bench.validate()?;

        Ok(bench)
    }

    fn check_ports(&self) -> Result<(), ConfigError> {
        if self.ports.is_empty() {
            return Err(ConfigError::BadBench(
                "A bench needs at least one port.".into(),
            ));
        }

        let duplicates = self.ports.iter().duplicates().collect::<Vec<_>>();
        if !duplicates.is_empty() {
            return Err(ConfigError::BadBench(format!(
                "Each port is one physical line and can only appear once. Duplicates: {duplicates:?}"
            )));
        }

        Ok(())
    }

    fn check_bauds(&self) -> Result<(), ConfigError> {
        if self.bauds.is_empty() {
            return Err(ConfigError::BadBench(
                "A bench needs at least one baud rate.".into(),
            ));
        }

        if self.bauds.contains(&0) {
            return Err(ConfigError::BadBench(
                "A baud rate of zero moves no bytes.".into(),
            ));
        }

        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.check_ports()?;
        self.check_bauds()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mock::MockHardware;

    #[test]
    fn example_round_trips_through_ron() {
        let bench = Bench::example();

        let serialized = bench.serialize_pretty();
        let deserialized = Bench::deserialize(&serialized).unwrap();

        assert_eq!(bench, deserialized);
    }

    #[test]
    fn a_handwritten_bench_deserializes() {
        let input = r#"
(
    ports: [
        "tty0",
        "tty1",
    ],
    bauds: [
        9600,
        115200,
    ],
)
"#;
        let bench = Bench::deserialize(input).unwrap();

        assert_eq!(bench.ports, vec!["tty0", "tty1"]);
        assert_eq!(bench.bauds, vec![9_600, 115_200]);
    }

    #[test]
    fn a_bench_loads_from_a_file() {
        let path = std::env::temp_dir().join("serial-helm-bench-roundtrip.ron");
        std::fs::write(&path, Bench::example().serialize_pretty()).unwrap();

        let bench = Bench::new_from_path(&path).unwrap();
        assert_eq!(bench, Bench::example());
    }

    #[test]
    fn a_missing_bench_file_is_a_config_problem() {
        let missing = Bench::new_from_path("/nowhere/no-such-bench.ron").unwrap_err();
        assert!(matches!(missing, ConfigError::BadBench(_)));
    }

    #[test]
    fn duplicate_ports_are_rejected_with_the_culprit_named() {
        let bench = Bench {
            ports: vec!["tty0".into(), "tty1".into(), "tty0".into()],
            bauds: vec![9_600],
        };

        let ConfigError::BadBench(problem) = bench.validate().unwrap_err() else {
            panic!("Expected a bench problem");
        };

        assert!(problem.contains("tty0"));
        assert!(!problem.contains("tty1"));
    }

    #[test]
    fn empty_benches_are_rejected() {
        let no_ports = Bench {
            ports: vec![],
            bauds: vec![9_600],
        };
        assert!(no_ports.validate().is_err());

        let no_bauds = Bench {
            ports: vec!["tty0".into()],
            bauds: vec![],
        };
        assert!(no_bauds.validate().is_err());
    }

    #[test]
    fn validation_against_the_hardware_layer() {
        let hardware = MockHardware::example();

        let valid = PortConfig::new("tty0", 115_200);
        assert!(validate(&hardware, &valid).is_ok());

        let unknown_port = PortConfig::new("value", 115_200);
        assert_eq!(
            validate(&hardware, &unknown_port).unwrap_err(),
            ConfigError::UnknownPort("value".into())
        );

        let bad_baud = PortConfig::new("tty0", 123);
        assert_eq!(
            validate(&hardware, &bad_baud).unwrap_err(),
            ConfigError::UnsupportedBaud(123)
        );
    }
}
