use oson_dom::event::EventWriter;
use oson_dom::oson::{encode_value, EncodeOptions, OsonEventSource};
use oson_dom::print::{
    events_to_string, to_json_string, PrintContext, PrintFlags, PrintOptions, SortMode,
};
use oson_dom::text::JsonTextSource;
use oson_dom::{Document, DomOptions, ParseOptions};
use serde_json::{json, Value};

struct Case {
    input: &'static str,
    options: PrintOptions,
    expected: &'static str,
}

fn plain() -> PrintOptions {
    PrintOptions::default()
}

fn cases() -> Vec<Case> {
    vec![
        Case {
            input: r#"{ "b" : 1 , "a" : [ 1.50 , "x" ] }"#,
            options: plain(),
            expected: r#"{"b":1,"a":[1.50,"x"]}"#,
        },
        Case {
            input: r#"{"b":1,"a":[1.50,"x"]}"#,
            options: plain().with_sort(SortMode::KeyName),
            expected: r#"{"a":[1.50,"x"],"b":1}"#,
        },
        Case {
            input: r#"{"b":1,"a":[1.50,"x"]}"#,
            options: plain().with_flags(PrintFlags::NUMFORMAT),
            expected: r#"{"b":1,"a":[1.5,"x"]}"#,
        },
        Case {
            input: r#"[-0.0, 1e2, 12E-1, 100]"#,
            options: plain().with_flags(PrintFlags::NUMFORMAT),
            expected: "[0,100,1.2,100]",
        },
        Case {
            input: r#"{"b":1,"a":[]}"#,
            options: PrintOptions::pretty().with_sort(SortMode::KeyName),
            expected: "{\n  \"a\": [],\n  \"b\": 1\n}",
        },
        Case {
            input: r#"[{"x":{}}]"#,
            options: PrintOptions::pretty(),
            expected: "[\n  {\n    \"x\": {}\n  }\n]",
        },
        Case {
            input: r#"{"ccc":1,"a":2,"bb":3,"ab":4}"#,
            options: plain().with_sort(SortMode::Optimize),
            expected: r#"{"a":2,"ab":4,"bb":3,"ccc":1}"#,
        },
        Case {
            input: r#"{"k":"tab\there ü 😀"}"#,
            options: plain(),
            expected: "{\"k\":\"tab\\there \u{fc} \u{1F600}\"}",
        },
        Case {
            input: r#"{"k":"tab\there ü 😀"}"#,
            options: plain().with_flags(PrintFlags::ASCII),
            expected: r#"{"k":"tab\there \u00fc \ud83d\ude00"}"#,
        },
        Case {
            input: r#""just a string""#,
            options: PrintOptions::pretty(),
            expected: r#""just a string""#,
        },
    ]
}

#[test]
fn text_print_matrix() {
    for case in cases() {
        let mut source = JsonTextSource::from_str(case.input, ParseOptions::default()).unwrap();
        let streamed = events_to_string(&mut source, case.options).unwrap();
        assert_eq!(streamed, case.expected, "streamed {}", case.input);

        let mut doc = Document::in_memory();
        let root = doc.load_text(case.input, &ParseOptions::default()).unwrap();
        let printed = to_json_string(&doc, root, case.options).unwrap();
        assert_eq!(printed, case.expected, "document {}", case.input);
    }
}

#[test]
fn lax_input_prints_strict() {
    let mut source =
        JsonTextSource::from_str("{a: 'x', B: TRUE, c: [1,],}", ParseOptions::lax()).unwrap();
    let text = events_to_string(&mut source, PrintOptions::default()).unwrap();
    assert_eq!(text, r#"{"a":"x","B":true,"c":[1]}"#);
}

#[test]
fn binary_documents_print_like_their_source() {
    let value = json!({"name": "n", "list": [1, 2.5, null, {"deep": [true]}], "e": {}});
    for options in [
        EncodeOptions::default(),
        EncodeOptions {
            streaming: true,
            ..EncodeOptions::default()
        },
    ] {
        let image = encode_value(&value, &options).unwrap();
        let mut source = OsonEventSource::new(image.clone(), &DomOptions::binary()).unwrap();
        let text = events_to_string(&mut source, PrintOptions::pretty()).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), value);

        let mut doc = Document::binary();
        let root = doc.load_from_binary_image(image).unwrap();
        let sorted = to_json_string(&doc, root, PrintOptions::default().with_sort(SortMode::KeyName))
            .unwrap();
        assert_eq!(
            sorted,
            r#"{"e":{},"list":[1,2.5,null,{"deep":[true]}],"name":"n"}"#
        );
    }
}

#[test]
fn one_context_prints_many_documents() {
    let mut ctx = PrintContext::new(PrintOptions::default());
    for value in [json!([1]), json!({"a": "b"}), json!(null)] {
        let doc = Document::from(&value);
        ctx.print_node(&doc, doc.root_node().unwrap()).unwrap();
        assert_eq!(
            serde_json::from_slice::<Value>(ctx.get_buffer()).unwrap(),
            value
        );
        ctx.reset();
        assert!(ctx.get_buffer().is_empty());
    }
}

#[test]
fn subtree_prints_on_its_own() {
    let doc = Document::from(&json!({"outer": {"inner": [1, 2]}}));
    let root = doc.root_node().unwrap();
    let outer = doc.field_by_name(root, "outer").unwrap().unwrap();
    assert_eq!(
        to_json_string(&doc, outer, PrintOptions::default()).unwrap(),
        r#"{"inner":[1,2]}"#
    );
}
