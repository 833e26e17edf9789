//! Projected columns

use std::fmt;

use super::source::SelectorName;

/// A projected column. `property == None` projects every column of the
/// selector (`sel.*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub selector: SelectorName,
    pub property: Option<String>,
    pub alias: Option<String>,
}

impl Column {
    pub fn new(selector: impl Into<SelectorName>, property: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            property: Some(property.into()),
            alias: None,
        }
    }

    pub fn all_of(selector: impl Into<SelectorName>) -> Self {
        Self {
            selector: selector.into(),
            property: None,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Key the value is reported under in result rows
    pub fn output_name(&self) -> Option<&str> {
        self.alias.as_deref().or(self.property.as_deref())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.property {
            Some(property) => write!(f, "{}.{}", self.selector, property)?,
            None => write!(f, "{}.*", self.selector)?,
        }
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}
