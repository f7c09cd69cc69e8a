//! XPath 1.0 queries over any tree that can be walked with a cursor.
//!
//! The query engine lives in [`gxpath_xpath1`] and is re-exported here. This
//! crate adds a ready-made cursor over parsed XML documents.
//!
//! ```
//! use gxpath::{NodeNavigator, XmlDocument};
//!
//! let doc = XmlDocument::parse("<ul><li>a</li><li>b</li></ul>").unwrap();
//! let items: Vec<String> = doc
//!     .select_nodes("//li[last()]")
//!     .unwrap()
//!     .iter()
//!     .map(|n| n.value())
//!     .collect();
//! assert_eq!(items, vec!["b".to_string()]);
//! ```

pub mod datasources;
pub mod error;

pub use datasources::xml::{XmlDocument, XmlNavigator};
pub use error::GxPathError;
pub use gxpath_xpath1::{
    Evaluation, Expr, NamespaceResolver, NodeIterator, NodeNavigator, NodeType, ValueType,
    XPathError, compile, must_compile,
};
#[allow(deprecated)]
pub use gxpath_xpath1::select;
