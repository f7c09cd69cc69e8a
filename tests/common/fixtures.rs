use gxpath_xpath1::tests::{HTML_ELEMENT, MockTree, create_html_tree};

/// The sample page as XML, without whitespace-only text between elements.
pub const HTML_XML: &str = concat!(
    r#"<html lang="en">"#,
    r#"<head><title>Hello</title><meta name="language" content="en"/></head>"#,
    r#"<body><h1>Hello</h1>"#,
    r#"<ul>"#,
    r#"<li><a id="1" href="/">Home</a></li>"#,
    r#"<li><a id="2" href="/about">about</a></li>"#,
    r#"<li><a id="3" href="/account">login</a></li>"#,
    r#"<li></li>"#,
    r#"</ul>"#,
    r#"<p>Hello,This is an example for gxpath.</p>"#,
    r#"<footer>footer script</footer>"#,
    r#"</body></html>"#,
);

pub const NAMESPACED_XML: &str = r#"<feed xmlns="urn:feed" xmlns:m="urn:media"><entry><title>One</title><m:thumbnail url="a.png"/></entry><entry><title>Two</title><m:thumbnail url="b.png" m:width="64"/></entry></feed>"#;

pub fn html_tree() -> MockTree {
    create_html_tree()
}

/// Id of the first element called `name` in `tree`.
pub fn element(tree: &MockTree, name: &str) -> usize {
    tree.element_ids(name)[0]
}

pub const HTML: usize = HTML_ELEMENT;
