use gxpath_xpath1::XPathError;
use thiserror::Error;

/// Errors surfaced by the convenience entry points that both parse a
/// document and compile an expression.
#[derive(Error, Debug)]
pub enum GxPathError {
    #[error("XML parsing failed: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("XPath compilation failed: {0}")]
    XPath(#[from] XPathError),
}
