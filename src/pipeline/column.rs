//! Variable (column) descriptors

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Measurement level of a variable, inferred from its values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    /// Categorical values, or a column with no defined values
    #[default]
    NominalOrOrdinal,
    /// Every defined value coerces to a finite number
    IntervalOrRatio,
}

impl std::fmt::Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableType::NominalOrOrdinal => write!(f, "nominal/ordinal"),
            VariableType::IntervalOrRatio => write!(f, "interval/ratio"),
        }
    }
}

/// Interpolation method for absent values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingMethod {
    Mean,
    Median,
    /// Copy the target value from the row with the closest reference value
    Nearest,
    /// Lagrange polynomial through up to three points per side of the reference value
    Lagrange,
}

impl MissingMethod {
    /// Whether the method needs a reference column
    pub fn needs_reference(self) -> bool {
        matches!(self, MissingMethod::Nearest | MissingMethod::Lagrange)
    }
}

impl std::str::FromStr for MissingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" => Ok(MissingMethod::Mean),
            "median" => Ok(MissingMethod::Median),
            "nearest" => Ok(MissingMethod::Nearest),
            "lagrange" => Ok(MissingMethod::Lagrange),
            _ => Err(format!(
                "Unknown missing method: '{}'. Use 'mean', 'median', 'nearest' or 'lagrange'.",
                s
            )),
        }
    }
}

/// Discretization strategy for a derived variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscretizeMethod {
    /// Equal-width buckets between min and max
    Width,
    /// Equal-frequency buckets by rank
    Frequency,
    /// One-dimensional k-means clusters
    Cluster,
}

impl DiscretizeMethod {
    pub fn label(self) -> &'static str {
        match self {
            DiscretizeMethod::Width => "width",
            DiscretizeMethod::Frequency => "frequency",
            DiscretizeMethod::Cluster => "cluster",
        }
    }
}

impl std::fmt::Display for DiscretizeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Parameters of a discretized sub-variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discretization {
    pub method: DiscretizeMethod,
    pub groups: usize,
}

/// Derived sub-variables requested for a column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubVariables {
    /// Append `<name>_standard` with `(x - mean) / std`
    pub standardize: bool,
    /// Append `<name>_center` with `x - mean`
    pub center: bool,
    /// Append one `<name>_<method>discrete` column per entry
    pub discretize: Vec<Discretization>,
}

impl SubVariables {
    pub fn is_empty(&self) -> bool {
        !self.standardize && !self.center && self.discretize.is_empty()
    }
}

/// Numeric summary of an interval/ratio variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    /// Single mode, or the Pearson empirical mode `3*median - 2*mean` when modes tie
    pub mode: f64,
}

/// Descriptor and statistics of one column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VariableType,
    pub count: usize,
    pub missing: usize,
    pub valid: usize,
    pub unique: usize,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub summary: Option<NumericSummary>,
    /// Raw values that stand for "missing" in this column
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_values: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_method: Option<MissingMethod>,
    /// Reference column for `nearest` and `lagrange`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_refer: Option<String>,
    #[serde(skip_serializing_if = "SubVariables::is_empty")]
    pub sub_vars: SubVariables,
    /// Synthesized by the sub-variable generator
    pub derived: bool,
}

impl Variable {
    /// Create a column with empty metadata
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_missing_values(mut self, values: Vec<Value>) -> Self {
        self.missing_values = values;
        self
    }

    pub fn with_missing_method(mut self, method: MissingMethod, refer: Option<&str>) -> Self {
        self.missing_method = Some(method);
        self.missing_refer = refer.map(str::to_string);
        self
    }

    pub fn with_sub_vars(mut self, sub_vars: SubVariables) -> Self {
        self.sub_vars = sub_vars;
        self
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == VariableType::IntervalOrRatio
    }

    /// A synthetic column that inherits the source's counts and type.
    ///
    /// Statistics are left empty for the next describe pass.
    pub(crate) fn derived_from(source: &Variable, name: String) -> Self {
        Self {
            name,
            kind: source.kind,
            count: source.count,
            missing: source.missing,
            valid: source.valid,
            unique: source.unique,
            derived: true,
            ..Default::default()
        }
    }
}
