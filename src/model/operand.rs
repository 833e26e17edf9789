//! Comparison operands

use std::fmt;

use super::source::SelectorName;
use crate::value::Value;

/// Operand evaluated per row
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicOperand {
    /// Value of a column of a selector
    PropertyValue {
        selector: SelectorName,
        property: String,
    },
    /// Length of the text form of the inner operand
    Length(Box<DynamicOperand>),
    LowerCase(Box<DynamicOperand>),
    UpperCase(Box<DynamicOperand>),
    /// Relevance score of the selector's row
    FullTextSearchScore { selector: SelectorName },
}

impl DynamicOperand {
    pub fn property(selector: impl Into<SelectorName>, property: impl Into<String>) -> Self {
        DynamicOperand::PropertyValue {
            selector: selector.into(),
            property: property.into(),
        }
    }

    pub fn length(self) -> Self {
        DynamicOperand::Length(Box::new(self))
    }

    pub fn lower_case(self) -> Self {
        DynamicOperand::LowerCase(Box::new(self))
    }

    pub fn upper_case(self) -> Self {
        DynamicOperand::UpperCase(Box::new(self))
    }

    pub fn score(selector: impl Into<SelectorName>) -> Self {
        DynamicOperand::FullTextSearchScore {
            selector: selector.into(),
        }
    }

    /// Selector the operand reads from
    pub fn selector(&self) -> &SelectorName {
        match self {
            DynamicOperand::PropertyValue { selector, .. }
            | DynamicOperand::FullTextSearchScore { selector } => selector,
            DynamicOperand::Length(inner)
            | DynamicOperand::LowerCase(inner)
            | DynamicOperand::UpperCase(inner) => inner.selector(),
        }
    }

    /// Innermost column reference, if any
    pub fn property_ref(&self) -> Option<(&SelectorName, &str)> {
        match self {
            DynamicOperand::PropertyValue { selector, property } => Some((selector, property)),
            DynamicOperand::FullTextSearchScore { .. } => None,
            DynamicOperand::Length(inner)
            | DynamicOperand::LowerCase(inner)
            | DynamicOperand::UpperCase(inner) => inner.property_ref(),
        }
    }

    /// Returns true if the operand yields the column's own values
    /// (possibly case-mapped), so the column's operator policy applies
    pub fn is_value_of_property(&self) -> bool {
        match self {
            DynamicOperand::PropertyValue { .. } => true,
            DynamicOperand::LowerCase(inner) | DynamicOperand::UpperCase(inner) => {
                inner.is_value_of_property()
            }
            _ => false,
        }
    }
}

impl fmt::Display for DynamicOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicOperand::PropertyValue { selector, property } => {
                write!(f, "{}.{}", selector, property)
            }
            DynamicOperand::Length(inner) => write!(f, "LENGTH({})", inner),
            DynamicOperand::LowerCase(inner) => write!(f, "LOWER({})", inner),
            DynamicOperand::UpperCase(inner) => write!(f, "UPPER({})", inner),
            DynamicOperand::FullTextSearchScore { selector } => write!(f, "SCORE({})", selector),
        }
    }
}

/// Operand fixed for the whole execution
#[derive(Debug, Clone, PartialEq)]
pub enum StaticOperand {
    Literal(Value),
    /// Resolved from the bind variables supplied at execution
    BindVariable(String),
}

impl fmt::Display for StaticOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticOperand::Literal(value) => write!(f, "{}", value),
            StaticOperand::BindVariable(name) => write!(f, "${}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_ref_through_functions() {
        let operand = DynamicOperand::property("doc", "title").lower_case().length();
        assert_eq!(operand.property_ref().map(|(s, p)| (s.as_str(), p)), Some(("doc", "title")));
        assert!(!operand.is_value_of_property());
        assert!(DynamicOperand::property("doc", "title").upper_case().is_value_of_property());
    }

    #[test]
    fn test_display() {
        let operand = DynamicOperand::property("doc", "title").upper_case();
        assert_eq!(operand.to_string(), "UPPER(doc.title)");
        assert_eq!(StaticOperand::BindVariable("x".into()).to_string(), "$x");
    }
}
