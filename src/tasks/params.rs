//! Task parameters: positional arguments, flag options and their parsed values.

use crate::config::{ConfigEntry, ConfigStore, ConfigValue, Lookup};

/// Value type of an argument or option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kind {
    /// Free text.
    #[default]
    String,
    /// `true`/`false`.
    Bool,
    /// Signed integer.
    Int,
}

impl Kind {
    /// Lowercase name, as used in stagefiles.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
        }
    }
}

/// A positional argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    name: String,
    description: String,
    kind: Kind,
    default: Option<ConfigValue>,
    multiple: bool,
    pub(crate) sequence: usize,
}

impl Argument {
    /// Create a required string argument.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: Kind::String,
            default: None,
            multiple: false,
            sequence: 0,
        }
    }

    /// Set the value type.
    pub fn kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    /// Set a default, which also makes the argument optional.
    pub fn default(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Accept one or more values. Only honoured on the last argument.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Argument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Value type.
    pub fn value_kind(&self) -> Kind {
        self.kind
    }

    /// Default value, if any.
    pub fn default_value(&self) -> Option<&ConfigValue> {
        self.default.as_ref()
    }

    /// Whether the argument takes several values.
    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Positional order.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// `<name>` or `<name>...`, as shown in help.
    pub fn explain(&self) -> String {
        if self.multiple {
            format!("<{}>...", self.name)
        } else {
            format!("<{}>", self.name)
        }
    }
}

/// A flag option, surfaced as `-x` (single character) or `--name`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOption {
    name: String,
    description: String,
    kind: Kind,
    default: Option<ConfigValue>,
}

impl TaskOption {
    /// Create a string option.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: Kind::String,
            default: None,
        }
    }

    /// Create a boolean flag.
    pub fn flag(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description).kind(Kind::Bool)
    }

    /// Set the value type.
    pub fn kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the value used when the option is absent.
    pub fn default(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Option name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Value type.
    pub fn value_kind(&self) -> Kind {
        self.kind
    }

    /// Default value, if any.
    pub fn default_value(&self) -> Option<&ConfigValue> {
        self.default.as_ref()
    }

    /// Single-character options use one dash.
    pub fn is_short(&self) -> bool {
        self.name.chars().count() == 1
    }

    /// `-x` or `--name`, as shown in help.
    pub fn explain(&self) -> String {
        if self.is_short() {
            format!("-{}", self.name)
        } else {
            format!("--{}", self.name)
        }
    }

    /// Value when the option is not given: its default or the zero value.
    pub fn fallback(&self) -> ConfigValue {
        match (&self.default, self.kind) {
            (Some(value), _) => value.clone(),
            (None, Kind::String) => ConfigValue::Str(String::new()),
            (None, Kind::Bool) => ConfigValue::Bool(false),
            (None, Kind::Int) => ConfigValue::Int(0),
        }
    }
}

/// The implicit option every task accepts.
pub fn help_option() -> TaskOption {
    TaskOption::flag("help", "Display help")
}

/// Parsed argument and option values for the running dispatch.
///
/// Arguments and options share one namespace. `Inputs` also works as a
/// template [`Lookup`], which is how stagefile selectors are rendered.
#[derive(Debug, Default)]
pub struct Inputs {
    values: ConfigStore,
}

impl Inputs {
    /// Create an empty set of inputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.set(name, value);
    }

    /// Raw entry.
    pub fn get(&self, name: &str) -> Option<&ConfigEntry> {
        self.values.get(name)
    }

    /// Check if a value was recorded.
    pub fn has(&self, name: &str) -> bool {
        self.values.has(name)
    }

    /// Value rendered as text.
    pub fn string(&self, name: &str) -> Option<String> {
        self.get(name).map(ConfigEntry::as_string)
    }

    /// Boolean value; absent or non-boolean reads as false.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name)
            .and_then(|e| e.try_bool().ok())
            .unwrap_or(false)
    }

    /// Integer value, if present and an integer.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|e| e.try_int().ok())
    }

    /// List value; a single value reads as a one-element list.
    pub fn list(&self, name: &str) -> Vec<String> {
        match self.get(name).map(ConfigEntry::value) {
            Some(ConfigValue::List(items)) => items.clone(),
            Some(other) => vec![other.as_string()],
            None => Vec::new(),
        }
    }

    /// All recorded names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.values.names()
    }
}

impl Lookup for Inputs {
    fn lookup(&self, name: &str) -> Option<&ConfigEntry> {
        self.values.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_explain() {
        assert_eq!(Argument::new("stage", "").explain(), "<stage>");
        assert_eq!(Argument::new("files", "").multiple().explain(), "<files>...");
    }

    #[test]
    fn option_explain_uses_dash_count() {
        assert_eq!(TaskOption::flag("v", "").explain(), "-v");
        assert_eq!(TaskOption::flag("verbose", "").explain(), "--verbose");
    }

    #[test]
    fn option_fallback_is_zero_value() {
        assert_eq!(TaskOption::new("branch", "").fallback(), ConfigValue::from(""));
        assert_eq!(TaskOption::flag("dry", "").fallback(), ConfigValue::Bool(false));
        assert_eq!(
            TaskOption::new("n", "").kind(Kind::Int).fallback(),
            ConfigValue::Int(0)
        );
        assert_eq!(
            TaskOption::new("branch", "").default("main").fallback(),
            ConfigValue::from("main")
        );
    }

    #[test]
    fn help_option_is_a_flag() {
        let help = help_option();
        assert_eq!(help.value_kind(), Kind::Bool);
        assert_eq!(help.explain(), "--help");
    }

    #[test]
    fn inputs_accessors() {
        let mut inputs = Inputs::new();
        inputs.set("stage", "prod");
        inputs.set("dry", true);
        inputs.set("count", 3);
        inputs.set("files", vec!["a", "b"]);

        assert_eq!(inputs.string("stage").as_deref(), Some("prod"));
        assert!(inputs.flag("dry"));
        assert!(!inputs.flag("stage"));
        assert_eq!(inputs.int("count"), Some(3));
        assert_eq!(inputs.list("files"), vec!["a", "b"]);
        assert_eq!(inputs.list("stage"), vec!["prod"]);
        assert!(inputs.list("missing").is_empty());
    }

    #[test]
    fn inputs_work_as_template_lookup() {
        let mut inputs = Inputs::new();
        inputs.set("stage", "prod");
        assert_eq!(
            crate::config::parse("{{stage}}-web", &inputs).unwrap(),
            "prod-web"
        );
    }
}
