use oson_dom::oson::{encode_value, EncodeOptions};
use oson_dom::{
    equals, Document, DomFlags, DomOptions, ErrorKind, NodeType, ParseOptions, ScalarValue,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        "[a-z0-9 ]{0,20}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::hash_map("[a-z]{1,6}", inner, 0..8)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn layouts() -> [EncodeOptions; 3] {
    [
        EncodeOptions::default(),
        EncodeOptions {
            sort_field_ids: false,
            ..EncodeOptions::default()
        },
        EncodeOptions {
            streaming: true,
            ..EncodeOptions::default()
        },
    ]
}

fn binary(value: &Value, options: &EncodeOptions) -> Document {
    let image = encode_value(value, options).unwrap();
    let mut doc = Document::new(DomOptions::binary().with_flags(DomFlags::VALIDATE));
    doc.load_from_binary_image(image).unwrap();
    doc
}

fn assert_all_layouts_agree(value: &Value) {
    let reference = Document::from(value);
    let reference_root = reference.root_node().unwrap();
    for options in layouts() {
        let doc = binary(value, &options);
        let root = doc.root_node().unwrap();
        assert!(
            equals(&reference, reference_root, &doc, root),
            "{options:?} disagrees on {value}"
        );
    }
}

/// Batched reads must agree with single reads at every container.
fn check_batches(doc: &Document, node: oson_dom::Node, batch: usize) {
    match doc.node_type(node).unwrap() {
        NodeType::Scalar => {}
        NodeType::Object => {
            let all = doc.all_fields(node).unwrap();
            let mut batched = Vec::new();
            let mut start = 0;
            while start < all.len() {
                let chunk = doc.fields_batch(node, start, batch).unwrap();
                assert!(!chunk.is_empty() && chunk.len() <= batch);
                start += chunk.len();
                batched.extend(chunk);
            }
            assert_eq!(batched.len(), all.len());
            for (a, b) in batched.iter().zip(&all) {
                assert_eq!(a.name.name(), b.name.name());
                assert_eq!(a.node, b.node);
                check_batches(doc, a.node, batch);
            }
        }
        NodeType::Array => {
            let len = doc.array_size(node).unwrap();
            let mut start = 0;
            while start < len {
                let chunk = doc.array_elements_batch(node, start, batch).unwrap();
                assert!(!chunk.is_empty() && chunk.len() <= batch);
                for (i, child) in chunk.iter().enumerate() {
                    assert_eq!(*child, doc.array_element(node, start + i).unwrap());
                    check_batches(doc, *child, batch);
                }
                start += chunk.len();
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Edit {
    Append(i64),
    Insert(usize, i64),
    DeleteItem(usize),
    Put(String, i64),
    Rename(String, String),
    DeleteField(String),
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        any::<i64>().prop_map(Edit::Append),
        (0usize..6, any::<i64>()).prop_map(|(i, v)| Edit::Insert(i, v)),
        (0usize..6).prop_map(Edit::DeleteItem),
        ("[a-k]{1,2}", any::<i64>()).prop_map(|(k, v)| Edit::Put(k, v)),
        ("[a-k]{1,2}", "[a-k]{1,2}").prop_map(|(a, b)| Edit::Rename(a, b)),
        "[a-k]{1,2}".prop_map(Edit::DeleteField),
    ]
}

proptest! {
    #[test]
    fn text_round_trip(value in arb_json()) {
        let text = serde_json::to_string(&value).unwrap();
        let mut parsed = Document::in_memory();
        let root = parsed.load_text(&text, &ParseOptions::default()).unwrap();
        let reference = Document::from(&value);
        prop_assert!(equals(&parsed, root, &reference, reference.root_node().unwrap()));
    }

    #[test]
    fn encodings_agree(value in arb_json()) {
        assert_all_layouts_agree(&value);
    }

    #[test]
    fn batched_reads_agree(value in arb_json(), batch in 1usize..10) {
        let reference = Document::from(&value);
        check_batches(&reference, reference.root_node().unwrap(), batch);
        for options in layouts() {
            let doc = binary(&value, &options);
            check_batches(&doc, doc.root_node().unwrap(), batch);
        }
    }

    #[test]
    fn modification_count_tracks_edits(edits in prop::collection::vec(arb_edit(), 0..40)) {
        let mut doc = Document::in_memory();
        let root = doc.load_json(&json!({"list": []})).unwrap();
        let list = doc.field_by_name(root, "list").unwrap().unwrap();
        let mut model_list: Vec<Value> = Vec::new();
        let mut model_fields = Map::new();

        for edit in edits {
            let before = doc.modification_count();
            let value = match &edit {
                Edit::Append(v) | Edit::Insert(_, v) | Edit::Put(_, v) => {
                    let node = doc.new_scalar(ScalarValue::Int64(*v)).unwrap();
                    prop_assert_eq!(doc.modification_count(), before + 1);
                    Some(node)
                }
                _ => None,
            };
            let before = doc.modification_count();
            let changed = match (edit, value) {
                (Edit::Append(v), Some(node)) => {
                    doc.append_item(list, node).unwrap();
                    model_list.push(json!(v));
                    true
                }
                (Edit::Insert(pos, v), Some(node)) => {
                    let result = doc.put_item(list, node, pos);
                    if pos <= model_list.len() {
                        result.unwrap();
                        model_list.insert(pos, json!(v));
                        true
                    } else {
                        prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::OutOfBounds);
                        doc.free_node(node).unwrap();
                        false
                    }
                }
                (Edit::DeleteItem(pos), None) => {
                    let result = doc.delete_item(list, pos);
                    if pos < model_list.len() {
                        result.unwrap();
                        model_list.remove(pos);
                        true
                    } else {
                        prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::OutOfBounds);
                        false
                    }
                }
                (Edit::Put(key, v), Some(node)) => {
                    doc.put_field(root, &key, node).unwrap();
                    model_fields.insert(key, json!(v));
                    true
                }
                (Edit::Rename(from, to), None) => {
                    let result = doc.rename_field(root, &from, &to);
                    if !model_fields.contains_key(&from) {
                        prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
                        false
                    } else if from != to && model_fields.contains_key(&to) {
                        prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidState);
                        false
                    } else {
                        result.unwrap();
                        if let Some(v) = model_fields.remove(&from) {
                            model_fields.insert(to, v);
                        }
                        true
                    }
                }
                (Edit::DeleteField(key), None) => {
                    let removed = doc.delete_field_by_name(root, &key).unwrap();
                    prop_assert_eq!(removed, model_fields.remove(&key).is_some());
                    removed
                }
                _ => unreachable!(),
            };
            let after = doc.modification_count();
            if changed {
                prop_assert!(after > before);
            } else {
                prop_assert!(after - before <= 1, "only the orphan cleanup may count");
            }
            doc.clear_error();
        }

        let mut expected = model_fields;
        expected.insert("list".to_string(), Value::Array(model_list));
        prop_assert_eq!(doc.to_json_value(root).unwrap(), Value::Object(expected));
    }
}

#[test]
fn deep_nesting_agrees_across_layouts() {
    let mut value = json!("leaf");
    for depth in 0..24 {
        value = if depth % 2 == 0 {
            json!([depth, value])
        } else {
            json!({"d": depth, "next": value})
        };
    }
    assert_all_layouts_agree(&value);
    let doc = binary(&value, &EncodeOptions::default());
    check_batches(&doc, doc.root_node().unwrap(), 1);
}

#[test]
fn read_only_calls_do_not_count() {
    let doc = Document::from(&json!({"a": [1, 2], "b": {"c": null}}));
    let before = doc.modification_count();
    let root = doc.root_node().unwrap();
    doc.all_fields(root).unwrap();
    let a = doc.field_by_name(root, "a").unwrap().unwrap();
    doc.array_elements_batch(a, 0, 10).unwrap();
    doc.to_json_value(root).unwrap();
    assert_eq!(doc.modification_count(), before);
}
