//! Filter-script (.mlx) parsing.
//!
//! A filter script is a small XML document listing named geometry
//! operations in the order they are to be applied:
//!
//! ```xml
//! <!DOCTYPE FilterScript>
//! <FilterScript>
//!   <filter name="Taubin Smooth">
//!     <Param type="RichFloat" name="lambda" value="0.5"/>
//!     <Param type="RichFloat" name="mu" value="-0.53"/>
//!     <Param type="RichInt" name="stepsmoothnum" value="10"/>
//!   </filter>
//! </FilterScript>
//! ```
//!
//! The script is opaque at this level: each operation is parsed as a name
//! plus a parameter map and handed to the smoothing backend in declared
//! order; operation semantics live entirely in the backend.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use roxmltree::{Document, ParsingOptions};

/// Errors produced while loading or querying a filter script.
#[derive(Debug)]
pub enum ScriptError {
    Io(std::io::Error),
    Xml(roxmltree::Error),
    /// Structurally wrong script document.
    Format(String),
    /// A parameter value could not be parsed as the requested type.
    Param { filter: String, param: String, value: String },
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Io(e) => write!(f, "filter script I/O error: {e}"),
            ScriptError::Xml(e) => write!(f, "filter script XML error: {e}"),
            ScriptError::Format(msg) => write!(f, "filter script format error: {msg}"),
            ScriptError::Param { filter, param, value } => write!(
                f,
                "filter {filter:?}: parameter {param:?} has unusable value {value:?}"
            ),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScriptError::Io(e) => Some(e),
            ScriptError::Xml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScriptError {
    fn from(err: std::io::Error) -> Self {
        ScriptError::Io(err)
    }
}

impl From<roxmltree::Error> for ScriptError {
    fn from(err: roxmltree::Error) -> Self {
        ScriptError::Xml(err)
    }
}

/// An ordered sequence of named filter operations.
#[derive(Debug, Clone)]
pub struct FilterScript {
    pub filters: Vec<FilterOp>,
}

/// One named operation with its parameters.
#[derive(Debug, Clone)]
pub struct FilterOp {
    pub name: String,
    pub params: HashMap<String, String>,
}

impl FilterOp {
    /// Integer parameter, falling back to `default` when absent.
    pub fn int_param(&self, name: &str, default: u32) -> Result<u32, ScriptError> {
        match self.params.get(name) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| ScriptError::Param {
                filter: self.name.clone(),
                param: name.to_string(),
                value: raw.clone(),
            }),
        }
    }

    /// Float parameter, falling back to `default` when absent.
    pub fn float_param(&self, name: &str, default: f64) -> Result<f64, ScriptError> {
        match self.params.get(name) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| ScriptError::Param {
                filter: self.name.clone(),
                param: name.to_string(),
                value: raw.clone(),
            }),
        }
    }
}

/// Read a filter-script file.
pub fn read_script<P: AsRef<Path>>(path: P) -> Result<FilterScript, ScriptError> {
    let text = fs::read_to_string(path)?;
    parse_script(&text)
}

/// Parse filter-script XML text.
pub fn parse_script(text: &str) -> Result<FilterScript, ScriptError> {
    // Scripts exported by interactive tools open with <!DOCTYPE FilterScript>.
    let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    let doc = Document::parse_with_options(text, options)?;
    let root = doc.root_element();
    if root.tag_name().name() != "FilterScript" {
        return Err(ScriptError::Format(format!(
            "root element is <{}>, expected <FilterScript>",
            root.tag_name().name()
        )));
    }

    let mut filters = Vec::new();
    for node in root.children().filter(|n| n.is_element()) {
        let tag = node.tag_name().name();
        if tag != "filter" && tag != "xmlfilter" {
            return Err(ScriptError::Format(format!(
                "unexpected element <{tag}> in filter script"
            )));
        }
        let name = node
            .attribute("name")
            .ok_or_else(|| ScriptError::Format("filter element has no name attribute".into()))?
            .to_string();

        let mut params = HashMap::new();
        for param in node.children().filter(|n| n.is_element()) {
            let ptag = param.tag_name().name();
            if ptag != "Param" && ptag != "param" {
                continue;
            }
            let pname = param.attribute("name").ok_or_else(|| {
                ScriptError::Format(format!("parameter of filter {name:?} has no name"))
            })?;
            let value = param.attribute("value").ok_or_else(|| {
                ScriptError::Format(format!(
                    "parameter {pname:?} of filter {name:?} has no value"
                ))
            })?;
            params.insert(pname.to_string(), value.to_string());
        }

        filters.push(FilterOp { name, params });
    }

    Ok(FilterScript { filters })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"<!DOCTYPE FilterScript>
<FilterScript>
  <filter name="Taubin Smooth">
    <Param type="RichFloat" name="lambda" value="0.5"/>
    <Param type="RichFloat" name="mu" value="-0.53"/>
    <Param type="RichInt" name="stepsmoothnum" value="10"/>
  </filter>
  <filter name="Laplacian Smooth"/>
</FilterScript>"#;

    #[test]
    fn parses_filters_in_order() {
        let script = parse_script(SCRIPT).unwrap();
        assert_eq!(script.filters.len(), 2);
        assert_eq!(script.filters[0].name, "Taubin Smooth");
        assert_eq!(script.filters[1].name, "Laplacian Smooth");
    }

    #[test]
    fn typed_parameter_access() {
        let script = parse_script(SCRIPT).unwrap();
        let taubin = &script.filters[0];
        assert_eq!(taubin.float_param("lambda", 0.0).unwrap(), 0.5);
        assert_eq!(taubin.float_param("mu", 0.0).unwrap(), -0.53);
        assert_eq!(taubin.int_param("stepsmoothnum", 3).unwrap(), 10);
        // Absent parameters fall back to the default.
        assert_eq!(taubin.int_param("missing", 7).unwrap(), 7);
    }

    #[test]
    fn unparseable_parameter_is_fatal() {
        let text = r#"<FilterScript>
  <filter name="Laplacian Smooth">
    <Param name="stepsmoothnum" value="three"/>
  </filter>
</FilterScript>"#;
        let script = parse_script(text).unwrap();
        let err = script.filters[0].int_param("stepsmoothnum", 3).unwrap_err();
        assert!(matches!(err, ScriptError::Param { .. }));
    }

    #[test]
    fn rejects_wrong_root() {
        assert!(matches!(
            parse_script("<NotAScript/>"),
            Err(ScriptError::Format(_))
        ));
    }

    #[test]
    fn rejects_unnamed_filter() {
        let text = "<FilterScript><filter/></FilterScript>";
        assert!(matches!(parse_script(text), Err(ScriptError::Format(_))));
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(matches!(
            parse_script("<FilterScript><filter"),
            Err(ScriptError::Xml(_))
        ));
    }
}
