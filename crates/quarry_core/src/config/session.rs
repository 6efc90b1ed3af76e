use std::collections::HashMap;
use std::sync::LazyLock;

use quarry_error::{DbError, Result};

use crate::arrays::scalar::ScalarValue;

/// Configuration for a session.
///
/// Passed by value into compilation. Scoped overrides are made by cloning the
/// config and modifying the clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Row cap applied to table and column results that don't specify a
    /// limit. `None` means unbounded.
    pub default_limit: Option<u64>,
    /// Report every query sent to the adapter.
    pub verbose: bool,
    /// Suffix for colliding right-side column names in joins.
    pub join_suffix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            default_limit: None,
            verbose: false,
            join_suffix: "_right".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn set_from_scalar(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::config(format!("Missing setting for '{name}'")))?;

        (func.set)(value, self)
    }

    pub fn get_as_scalar(&self, name: &str) -> Result<ScalarValue> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::config(format!("Missing setting for '{name}'")))?;

        Ok((func.get)(self))
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::config(format!("Missing setting for '{name}'")))?;

        let scalar = (func.get)(&Self::default());
        (func.set)(scalar, self)
    }

    /// Names and descriptions of all settings, sorted by name.
    pub fn settings() -> Vec<(&'static str, &'static str)> {
        let mut settings: Vec<_> = GET_SET_FUNCTIONS
            .iter()
            .map(|(name, funcs)| (*name, funcs.description))
            .collect();
        settings.sort_unstable();
        settings
    }
}

struct SettingFunctions {
    description: &'static str,
    set: fn(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()>,
    get: fn(conf: &SessionConfig) -> ScalarValue,
}

impl SettingFunctions {
    const fn new<S: SessionSetting>() -> Self {
        SettingFunctions {
            description: S::DESCRIPTION,
            set: S::set_from_scalar as _,
            get: S::get_as_scalar as _,
        }
    }
}

fn insert_setting<S: SessionSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<DefaultLimit>(&mut map);
    insert_setting::<Verbose>(&mut map);
    insert_setting::<JoinSuffix>(&mut map);

    map
});

pub trait SessionSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()>;
    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue;
}

pub struct DefaultLimit;

impl SessionSetting for DefaultLimit {
    const NAME: &'static str = "sql.default_limit";
    const DESCRIPTION: &'static str =
        "Rows returned by table results without an explicit limit, NULL for unbounded";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        conf.default_limit = match scalar {
            ScalarValue::Null => None,
            other => Some(other.try_as_u64()?),
        };
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.default_limit.into()
    }
}

pub struct Verbose;

impl SessionSetting for Verbose {
    const NAME: &'static str = "verbose";
    const DESCRIPTION: &'static str = "Report every query sent to the adapter";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        conf.verbose = scalar.try_as_bool()?;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.verbose.into()
    }
}

pub struct JoinSuffix;

impl SessionSetting for JoinSuffix {
    const NAME: &'static str = "join_suffix";
    const DESCRIPTION: &'static str = "Suffix appended to colliding right-side join columns";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        let val = scalar.try_into_string()?;
        if val.is_empty() {
            return Err(DbError::config("Join suffix cannot be empty"));
        }
        conf.join_suffix = val;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.join_suffix.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use quarry_error::ErrorKind;

    use super::*;

    #[test]
    fn set_get_default_limit() {
        let mut conf = SessionConfig::default();
        assert_eq!(ScalarValue::Null, conf.get_as_scalar("sql.default_limit").unwrap());

        conf.set_from_scalar("sql.default_limit", ScalarValue::Int64(20))
            .unwrap();
        assert_eq!(Some(20), conf.default_limit);
        assert_eq!(
            ScalarValue::UInt64(20),
            conf.get_as_scalar("sql.default_limit").unwrap()
        );

        conf.set_from_scalar("sql.default_limit", ScalarValue::Null)
            .unwrap();
        assert_eq!(None, conf.default_limit);
    }

    #[test]
    fn negative_limit_rejected() {
        let mut conf = SessionConfig::default();
        conf.set_from_scalar("sql.default_limit", ScalarValue::Int64(-1))
            .unwrap_err();
    }

    #[test]
    fn unknown_setting() {
        let mut conf = SessionConfig::default();
        let err = conf
            .set_from_scalar("does_not_exist", true.into())
            .unwrap_err();
        assert_eq!(ErrorKind::Config, err.kind());
    }

    #[test]
    fn reset_to_default() {
        let mut conf = SessionConfig::default();
        conf.set_from_scalar("join_suffix", "_y".into()).unwrap();
        assert_eq!("_y", conf.join_suffix);

        conf.reset("join_suffix").unwrap();
        assert_eq!("_right", conf.join_suffix);
    }

    #[test]
    fn settings_listed() {
        let names: Vec<_> = SessionConfig::settings()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(vec!["join_suffix", "sql.default_limit", "verbose"], names);
    }
}
