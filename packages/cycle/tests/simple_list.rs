//! The list application: type a name, press the button, the name joins the
//! list.

use std::cell::RefCell;
use std::rc::Rc;

use cycle::{
    attrs, driver_fn, h, mock_dom_response, run, text, Document, DomDriver, DomEvent, DomResponse,
    Drivers, Node, Requests, Responses, RunError, Stream, Subject, VNode,
};

#[derive(Clone, Debug, PartialEq)]
struct State {
    items: Vec<String>,
    new_name: String,
}

impl State {
    fn initial() -> Self {
        Self {
            items: vec!["hello".to_string(), "world".to_string()],
            new_name: String::new(),
        }
    }
}

fn model(names: &Stream<String>, adds: &Stream<DomEvent>) -> Stream<State> {
    names
        .and(adds)
        .then_do(|name, _click| name)
        .scan(State::initial(), |state, name| {
            let mut items = state.items.clone();
            items.push(name);
            State {
                items,
                new_name: String::new(),
            }
        })
        .start_with(State::initial())
}

fn view(state: State) -> VNode {
    h(
        "div",
        attrs! {},
        vec![
            h(
                "input.new-name",
                attrs! { "placeholder" => "Item name", "value" => state.new_name },
                vec![],
            ),
            h("button.add-item", attrs! {}, vec![text("Add")]),
            h(
                "ul",
                attrs! {},
                state
                    .items
                    .into_iter()
                    .map(|item| h("li", attrs! {}, vec![text(item)])),
            ),
        ],
    )
}

fn simple_list(responses: &Responses) -> Result<Requests, RunError> {
    let dom = responses.get::<DomResponse>("DOM")?;
    let names = dom
        .select("input.new-name")?
        .events("change")
        .map(|event| event.target().value().unwrap_or_default());
    let adds = dom.select("button.add-item")?.events("click");
    Ok(Requests::new().with("DOM", model(&names, &adds).map(view)))
}

fn items(app: &Node) -> Vec<String> {
    app.query_selector_all("li")
        .unwrap()
        .iter()
        .map(Node::text_content)
        .collect()
}

fn list_items(tree: &VNode) -> Vec<String> {
    tree.descendants()
        .filter(|node| node.tag() == Some("li"))
        .map(VNode::text_content)
        .collect()
}

#[test]
fn test_main_against_a_mock_response() {
    let document = Document::new();
    let input = document.create_element("input");
    let button = document.create_element("button");

    let changes = Subject::new();
    let clicks = Subject::new();
    let mock = mock_dom_response([
        ("input.new-name", [("change", changes.stream())]),
        ("button.add-item", [("click", clicks.stream())]),
    ]);

    let trees = Rc::new(RefCell::new(Vec::new()));
    let recorded = Rc::clone(&trees);
    let keep = Rc::new(RefCell::new(Vec::new()));
    let drivers = Drivers::new().with(
        "DOM",
        driver_fn(move |requests: Stream<VNode>| -> Result<DomResponse, RunError> {
            let recorded = Rc::clone(&recorded);
            keep.borrow_mut()
                .push(requests.subscribe_next(move |tree| recorded.borrow_mut().push(tree)));
            Ok(mock.clone())
        }),
    );
    let runtime = run(simple_list, drivers).unwrap();

    assert_eq!(trees.borrow().len(), 1);
    assert_eq!(list_items(&trees.borrow()[0]), vec!["hello", "world"]);

    input.set_value("milk").unwrap();
    changes.next(DomEvent::new("change", input.clone()));
    clicks.next(DomEvent::new("click", button.clone()));
    // A second click without a new change event has nothing to pair with.
    clicks.next(DomEvent::new("click", button));

    let trees = trees.borrow();
    assert_eq!(trees.len(), 2);
    assert_eq!(list_items(&trees[1]), vec!["hello", "world", "milk"]);
    drop(runtime);
}

#[test]
fn test_list_in_a_live_document() {
    let document = Document::new();
    let app = document.create_element("div");
    app.set_attribute("id", "app").unwrap();
    document.body().append_child(&app).unwrap();

    let runtime = run(
        simple_list,
        Drivers::new().with("DOM", DomDriver::from_selector(&document, "#app")),
    )
    .unwrap();
    assert_eq!(items(&app), vec!["hello", "world"]);

    let input = app.query_selector("input.new-name").unwrap().unwrap();
    let add = app.query_selector("button.add-item").unwrap().unwrap();

    input.set_value("milk").unwrap();
    input.dispatch("change");
    add.click();
    assert_eq!(items(&app), vec!["hello", "world", "milk"]);

    let first = app.query_selector("li").unwrap().unwrap();
    input.set_value("eggs").unwrap();
    input.dispatch("change");
    input.set_value("bread").unwrap();
    input.dispatch("change");
    add.click();
    assert_eq!(items(&app), vec!["hello", "world", "milk", "bread"]);

    // Existing items are patched in place, not rebuilt.
    assert_eq!(app.query_selector("li").unwrap().unwrap(), first);
    drop(runtime);
}

#[test]
fn test_click_before_any_name_adds_nothing() {
    let document = Document::new();
    let app = document.create_element("div");
    document.body().append_child(&app).unwrap();
    let _runtime =
        run(simple_list, Drivers::new().with("DOM", DomDriver::new(app.clone()))).unwrap();

    app.query_selector("button.add-item").unwrap().unwrap().click();
    assert_eq!(items(&app), vec!["hello", "world"]);
}
