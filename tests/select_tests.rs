mod common;

use common::fixtures::*;
use common::{TestResult, init_logger, labels, select_all, select_first};
use gxpath::{Evaluation, NodeNavigator, NodeType, compile};

#[test]
fn test_self() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    assert_first_label!(html, ".", "html");
    assert_first_label!(tree.navigator(element(&tree, "head")), ".", "head");
    assert_first_label!(html, "self::*", "html");
    assert_first_label!(tree.navigator(element(&tree, "body")), "self::body", "body");
    assert_count!(html, "//body/./ul/li/a", 3);
    Ok(())
}

#[test]
fn test_parent() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);
    let body = tree.navigator(element(&tree, "body"));

    assert_first_label!(body, "..", "html");
    assert_first_label!(body, "parent::*", "html");

    let a = select_first(&html, "//li/a")?.expect("an anchor");
    assert_first_label!(a, "parent::*", "li");
    assert_first_label!(html, "//title/parent::head", "head");
    Ok(())
}

#[test]
fn test_attribute() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    // A boolean expression selects the context node when it holds.
    assert_first_label!(html, "@lang='en'", "html");
    assert_count!(html, "@lang='zh'", 0);
    assert_count!(html, "//@href", 3);
    assert_count!(html, "//a[@*]", 3);
    assert_count!(html, "//meta/@*", 2);

    let lang = select_first(&html, "@*")?.expect("an attribute");
    assert_eq!(lang.node_type(), NodeType::Attribute);
    assert_eq!(lang.node_id(), HTML);
    assert_eq!(lang.value(), "en");
    Ok(())
}

#[test]
fn test_relative_path() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    assert_first_label!(html, "head", "head");
    assert_first_label!(html, "/head", "head");
    assert_first_label!(html, "/head/title", "title");
    assert_count!(html, "/body/ul/li/a", 3);
    assert_first_label!(html, "//title", "title");
    assert_first_label!(html, "//title/..", "head");
    assert_first_label!(html, "//title/../..", "html");
    assert_count!(html, "//a[@href]", 3);
    assert_first_label!(html, "//ul/../footer", "footer");
    Ok(())
}

#[test]
fn test_child() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    assert_first_label!(html, "/child::head", "head");
    assert_first_label!(html, "/child::head/child::title", "title");
    assert_first_label!(html, "//title/../child::title", "title");
    assert_first_label!(tree.navigator(tree.document()), "//child::*", "html");
    Ok(())
}

#[test]
fn test_descendant() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    assert_count!(html, "descendant::*", 15);
    assert_count!(html, "/head/descendant::*", 2);
    assert_count!(html, "//ul/descendant::*", 7);
    assert_count!(html, "//ul/descendant::li", 4);
    assert_count!(html, "descendant-or-self::*", 16);
    Ok(())
}

#[test]
fn test_ancestor() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    assert_count!(html, "/body/footer/ancestor::*", 2);
    assert_count!(html, "/body/ul/li/a/ancestor::li", 3);
    assert_eq!(labels(&html, "//a/ancestor-or-self::*[position() < 3]")?, vec!["li", "a", "li", "a", "li", "a"]);
    assert_eq!(labels(&html, "/body/footer/ancestor::*")?, vec!["html", "body"]);
    Ok(())
}

#[test]
fn test_following_sibling() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    let siblings = labels(&html, "//li/following-sibling::*")?;
    assert_eq!(siblings.len(), 3);
    assert!(siblings.iter().all(|name| *name == "li"));

    assert_eq!(labels(&html, "//ul/following-sibling::*")?, vec!["p", "footer"]);
    assert_first_label!(html, "//ul/following-sibling::footer", "footer");
    Ok(())
}

#[test]
fn test_preceding_sibling() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    // Nearest first within the step, document order in the result.
    assert_first_label!(html, "/body/footer/preceding-sibling::*[1]", "p");
    assert_eq!(labels(&html, "/body/footer/preceding-sibling::*")?, vec!["h1", "ul", "p"]);
    Ok(())
}

#[test]
fn test_following_and_preceding() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    assert_eq!(labels(&html, "//ul/following::*")?, vec!["p", "footer"]);
    assert_eq!(labels(&html, "//h1/following::*")?.len(), 10);
    assert_eq!(labels(&html, "//ul/preceding::*")?, vec!["head", "title", "meta", "h1"]);
    assert_first_label!(html, "//footer/preceding::*[1]", "p");
    assert_first_label!(html, "//li[1]/following::li[1]", "li");
    Ok(())
}

#[test]
fn test_star() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    assert_first_label!(html, "/head/*", "title");
    assert_count!(html, "//ul/*", 4);
    assert_count!(html, "/body/h1/*", 0);
    assert_count!(html, "//ul/*/a", 3);
    Ok(())
}

#[test]
fn test_node_type_tests() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    assert_first_label!(html, "//title/text()", "Hello");
    assert_first_label!(html, "//a[@href='/']/text()", "Home");
    assert_count!(html, "//head/node()", 2);
    assert_count!(html, "//title/node()", 1);
    assert_count!(html, "//text()", 7);
    assert_count!(html, "//comment()", 0);
    Ok(())
}

#[test]
fn test_position() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);
    let head = element(&tree, "head");
    let items = tree.element_ids("li");

    let first_id = |expr: &str| -> Result<Option<usize>, gxpath::XPathError> {
        Ok(select_first(&html, expr)?.map(|n| n.node_id()))
    };

    assert_eq!(first_id("/head[1]")?, Some(head));
    assert_eq!(first_id("/head[last()]")?, Some(head));
    assert_eq!(first_id("//li[1]")?, Some(items[0]));
    assert_eq!(first_id("//li[4]")?, Some(items[3]));
    assert_eq!(first_id("//li[last()]")?, Some(items[3]));
    assert_eq!(first_id("//li[floor(3 div 2)]")?, Some(items[0]));
    assert_eq!(first_id("//li[5]")?, None);
    Ok(())
}

#[test]
fn test_predicate() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);
    let items = tree.element_ids("li");

    assert_first_label!(tree.navigator(tree.document()), "html[@lang='en']", "html");
    assert_first_label!(html, "//a[@href='/']", "a");
    assert_first_label!(html, "//meta[@name]", "meta");

    let fourth = select_first(&html, "//li[position()=4]")?.expect("a fourth item");
    assert_eq!(fourth.node_id(), items[3]);
    assert_count!(fourth, "a", 0);

    let first = select_first(&html, "//li[position()=1]")?.expect("a first item");
    assert_eq!(first.node_id(), items[0]);
    assert_count!(html, "//li[position()>0]", 4);
    Ok(())
}

#[test]
fn test_operators_in_predicates() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);
    let items = tree.element_ids("li");
    let anchors = tree.element_ids("a");

    let first_id = |expr: &str| -> Result<Option<usize>, gxpath::XPathError> {
        Ok(select_first(&html, expr)?.map(|n| n.node_id()))
    };

    assert_eq!(first_id("//li[1+1]")?, Some(items[1]));
    assert_eq!(first_id("//li[4 div 2]")?, Some(items[1]));
    assert_eq!(first_id("//li[3 mod 2]")?, Some(items[0]));
    assert_eq!(first_id("//li[3 - 2]")?, Some(items[0]));
    assert_eq!(first_id("//a[@id=1 and @href='/']")?, Some(anchors[0]));

    assert_count!(html, "//a[@id>=1]", 3);
    assert_count!(html, "//a[@id<2]", 1);
    assert_count!(html, "//a[@id!=2]", 2);
    assert_count!(html, "//a[@id=1 or @id=3]", 2);
    Ok(())
}

#[test]
fn test_boolean_expression_at_root() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    assert!(matches!(compile("@lang='en'")?.evaluate(&html), Evaluation::Boolean(true)));
    assert!(matches!(compile("@lang='zh'")?.evaluate(&html), Evaluation::Boolean(false)));
    Ok(())
}

#[test]
fn test_scalar_evaluation() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    let number = |expr: &str| -> Result<f64, gxpath::XPathError> {
        match compile(expr)?.evaluate(&html) {
            Evaluation::Number(n) => Ok(n),
            other => panic!("`{}` evaluated to {:?}", expr, other),
        }
    };
    let string = |expr: &str| -> Result<String, gxpath::XPathError> {
        match compile(expr)?.evaluate(&html) {
            Evaluation::String(s) => Ok(s),
            other => panic!("`{}` evaluated to {:?}", expr, other),
        }
    };

    assert_eq!(number("count(//li)")?, 4.0);
    assert_eq!(number("sum(//a/@id)")?, 6.0);
    assert_eq!(number("string-length(//p)")?, 36.0);
    assert_eq!(string("concat(//title, ' ', //footer)")?, "Hello footer script");
    assert_eq!(string("substring-after(//a[@id=2]/@href, '/')")?, "about");
    assert_eq!(string("translate(//h1, 'lo', 'LO')")?, "HeLLO");
    assert_eq!(string("name(//meta/@content)")?, "content");
    assert_eq!(string("string(//li[last()])")?, "");
    Ok(())
}

#[test]
fn test_node_set_evaluation_iterates_in_document_order() -> TestResult {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    match compile("//a/@href | //title")?.evaluate(&html) {
        Evaluation::NodeSet(nodes) => {
            let values: Vec<String> = nodes.map(|n| n.value()).collect();
            assert_eq!(values, vec!["Hello", "/", "/about", "/account"]);
        }
        other => panic!("expected a node-set, got {:?}", other),
    }
    assert_eq!(select_all(&html, "//footer | //h1 | //footer")?.len(), 2);
    Ok(())
}

#[test]
fn test_one_shot_select() {
    init_logger();
    let tree = html_tree();
    let html = tree.navigator(HTML);

    #[allow(deprecated)]
    let mut iter = gxpath::select(&html, "//footer");
    assert!(iter.move_next());
    assert_eq!(iter.current().label(), "footer");
    assert!(!iter.move_next());
}

#[test]
#[should_panic(expected = "undeclared variable")]
fn test_one_shot_select_panics_on_bad_expression() {
    let tree = html_tree();
    let html = tree.navigator(HTML);

    #[allow(deprecated)]
    let _ = gxpath::select(&html, "//a[@id = $id]");
}
