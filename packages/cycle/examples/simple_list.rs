//! A list you can add names to.
//!
//! Renders into an in-memory document, simulates a user typing two names and
//! pressing "Add", and prints the document after each step.
//!
//! Run with `RUST_LOG=debug` to watch the driver mount and patch.

use cycle::{
    attrs, h, run, text, Document, DomDriver, DomEvent, DomResponse, Drivers, Requests,
    Responses, RunError, Stream, VNode,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct State {
    items: Vec<String>,
    new_name: String,
}

impl Default for State {
    fn default() -> Self {
        Self {
            items: vec!["hello".to_string(), "world".to_string()],
            new_name: String::new(),
        }
    }
}

struct Actions {
    new_name_change: Stream<String>,
    add_item_click: Stream<DomEvent>,
}

fn intent(dom: &DomResponse) -> Result<Actions, RunError> {
    Ok(Actions {
        new_name_change: dom
            .select("input.new-name")?
            .events("change")
            .map(|event| event.target().value().unwrap_or_default()),
        add_item_click: dom.select("button.add-item")?.events("click"),
    })
}

fn model(actions: Actions) -> Stream<State> {
    actions
        .new_name_change
        .and(&actions.add_item_click)
        .then_do(|new_name, _click| new_name)
        .scan(State::default(), |state, new_name| {
            let mut items = state.items.clone();
            items.push(new_name);
            State {
                items,
                new_name: String::new(),
            }
        })
        .start_with(State::default())
}

fn view(state: State) -> VNode {
    h(
        "div",
        attrs! {},
        vec![
            h(
                "input",
                attrs! {
                    "className" => "new-name",
                    "placeholder" => "Item name",
                    "value" => state.new_name,
                },
                vec![],
            ),
            h("button", attrs! { "className" => "add-item" }, vec![text("Add")]),
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
    let state = model(intent(&dom)?);
    Ok(Requests::new().with("DOM", state.map(view)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let document = Document::new();
    let app = document.create_element("div");
    app.set_attribute("id", "app")?;
    document.body().append_child(&app)?;

    let runtime = run(
        simple_list,
        Drivers::new().with("DOM", DomDriver::from_selector(&document, "#app")),
    )?;
    println!("{}", app.outer_html());

    for name in ["milk", "eggs"] {
        let input = app
            .query_selector("input.new-name")?
            .ok_or("input missing")?;
        info!(name, "adding item");
        input.set_value(name)?;
        input.dispatch("change");
        app.query_selector("button.add-item")?
            .ok_or("button missing")?
            .click();
        println!("{}", app.outer_html());
    }

    drop(runtime);
    Ok(())
}
