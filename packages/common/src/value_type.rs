use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("unknown value type '{0}'")]
    UnknownType(String),
    #[error("the value '{value}' is not a valid {kind}")]
    Mismatch { value: String, kind: ValueType },
}

/// Base type declared by a unit. Values are stored as strings and normalised
/// according to this type on ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Float,
    Int,
    Bool,
}

impl ValueType {
    pub const ALL: [ValueType; 4] = [
        ValueType::String,
        ValueType::Float,
        ValueType::Int,
        ValueType::Bool,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Float => "float",
            ValueType::Int => "int",
            ValueType::Bool => "bool",
        }
    }

    /// Check `raw` against this type and return its canonical text form.
    pub fn normalize(self, raw: &str) -> Result<String, ValueError> {
        let mismatch = || ValueError::Mismatch {
            value: raw.to_string(),
            kind: self,
        };
        match self {
            ValueType::String => Ok(raw.to_string()),
            ValueType::Float => {
                let v: f32 = raw.trim().parse().map_err(|_| mismatch())?;
                if !v.is_finite() {
                    return Err(mismatch());
                }
                if v.fract() == 0.0 && v.abs() < 1e7 {
                    Ok(format!("{v:.1}"))
                } else {
                    Ok(v.to_string())
                }
            }
            ValueType::Int => {
                let v: i32 = raw.trim().parse().map_err(|_| mismatch())?;
                Ok(v.to_string())
            }
            ValueType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Ok("true".into()),
                "false" | "off" | "no" | "0" => Ok("false".into()),
                _ => Err(mismatch()),
            },
        }
    }
}

impl FromStr for ValueType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValueError::UnknownType(s.to_string()))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
