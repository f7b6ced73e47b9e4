use std::borrow::Cow;

use chrono::{FixedOffset, NaiveDate, TimeZone};
use oson_dom::config::NumberEncoding;
use oson_dom::event::{EventWriter, RecordedSource};
use oson_dom::oson::{
    decode_events, encode_events, encode_into, encode_value, EncodeOptions, OsonEncoder,
    OsonPatcher, PatchMode, Step,
};
use oson_dom::print::{PrintContext, PrintOptions};
use oson_dom::scalar::temporal::{DaySecond, YearMonth};
use oson_dom::scalar::{scalar_equals, Decimal, ScalarKind};
use oson_dom::text::JsonTextSource;
use oson_dom::{
    equals, Document, DomError, DomFlags, DomOptions, ErrorKind, ParseOptions, ScalarValue,
};
use serde_json::{json, Value};
use uuid::Uuid;

const TEXTS: &[&str] = &[
    "null",
    "true",
    "-12.5e3",
    r#""plain""#,
    "[]",
    "{}",
    r#"{"a":1,"b":[true,null,"x"]}"#,
    r#"[[[]],[{}],{"k":[{"k":"v"}]}]"#,
    r#"{"long":"a string that is much longer than fifteen bytes","n":123456789012345678901234567890}"#,
    r#"{"z":0,"y":1,"x":2,"w":3,"v":4,"u":5,"t":6,"s":7,"r":8,"q":9}"#,
];

fn layouts() -> Vec<EncodeOptions> {
    vec![
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

#[test]
fn text_to_image_to_document_matrix() {
    for text in TEXTS {
        let mut reference = Document::in_memory();
        let reference_root = reference.load_text(text, &ParseOptions::default()).unwrap();
        for options in layouts() {
            let mut source = JsonTextSource::from_str(text, ParseOptions::default()).unwrap();
            let image = encode_events(&mut source, &options).unwrap();
            let mut doc = Document::new(DomOptions::binary().with_flags(DomFlags::VALIDATE_STRINGS));
            let root = doc.load_from_binary_image(image).unwrap();
            assert!(
                equals(&reference, reference_root, &doc, root),
                "{text} with {options:?}"
            );
        }
    }
}

#[test]
fn decode_events_feeds_any_writer() {
    let value = json!({"a": [1, 2], "b": {"c": "d"}});
    let image = encode_value(&value, &EncodeOptions::default()).unwrap();
    let mut printer = PrintContext::new(PrintOptions::default());
    decode_events(image.clone(), &mut printer).unwrap();
    let printed: Value = serde_json::from_slice(printer.get_buffer()).unwrap();
    assert_eq!(printed, value);

    let mut encoder = OsonEncoder::new(EncodeOptions {
        streaming: true,
        ..EncodeOptions::default()
    });
    decode_events(image.clone(), &mut encoder).unwrap();
    let mut streamed = Document::binary();
    let streamed_root = streamed.load_from_binary_image(encoder.take_image()).unwrap();
    let mut indexed = Document::binary();
    let indexed_root = indexed.load_from_binary_image(image).unwrap();
    assert!(equals(&streamed, streamed_root, &indexed, indexed_root));
}

#[test]
fn extended_scalars_keep_their_kind() {
    let stamp = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_nano_opt(13, 45, 30, 123_456_789)
        .unwrap();
    let zoned = FixedOffset::east_opt(5 * 3600 + 1800)
        .unwrap()
        .from_local_datetime(&stamp)
        .single()
        .unwrap();
    let scalars = vec![
        ScalarValue::Int32(-7),
        ScalarValue::UInt32(7),
        ScalarValue::Int64(i64::MIN),
        ScalarValue::UInt64(u64::MAX),
        ScalarValue::Float(1.5),
        ScalarValue::Double(-0.25),
        ScalarValue::Binary(Cow::Borrowed(&[0, 1, 2, 0xFF])),
        ScalarValue::Timestamp(stamp),
        ScalarValue::Oid([7; 12]),
        ScalarValue::Uuid(Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef)),
        ScalarValue::id(vec![1u8, 2, 3]).unwrap(),
        ScalarValue::ora_number(&Decimal::parse("-3.25").unwrap()).unwrap(),
        ScalarValue::ora_date(&stamp),
        ScalarValue::ora_timestamp(&stamp),
        ScalarValue::ora_timestamp_tz(&zoned),
        ScalarValue::ora_time(&stamp.time()),
        ScalarValue::year_month(&YearMonth {
            years: 3,
            months: 7,
        }),
        ScalarValue::day_second(&DaySecond {
            days: -2,
            hours: -4,
            minutes: -5,
            seconds: -6,
            nanos: -700_000_000,
        }),
        ScalarValue::number("1e400").unwrap(),
    ];
    let mut doc = Document::in_memory();
    let root = doc.new_array(scalars.len()).unwrap();
    for value in &scalars {
        let node = doc.new_scalar(value.clone()).unwrap();
        doc.append_item(root, node).unwrap();
    }
    doc.set_root(Some(root)).unwrap();
    let image = doc.to_binary_image(root).unwrap();

    let mut bin = Document::new(DomOptions::binary().with_flags(DomFlags::VALIDATE));
    let bin_root = bin.load_from_binary_image(image).unwrap();
    for (i, expected) in scalars.iter().enumerate() {
        let node = bin.array_element(bin_root, i).unwrap();
        let got = bin.scalar_info(node).unwrap();
        assert_eq!(got.kind(), expected.kind(), "element {i}");
        assert_eq!(got.kind().is_json(), expected.kind() == ScalarKind::Number);
        assert!(scalar_equals(&got, expected), "element {i}: {got:?}");
    }
}

#[test]
fn number_policy_on_encode() {
    let events = RecordedSource::new(vec![
        oson_dom::EventRecord::StartArray,
        oson_dom::EventRecord::Item(ScalarValue::number("42").unwrap()),
        oson_dom::EventRecord::Item(ScalarValue::number("0.5").unwrap()),
        oson_dom::EventRecord::EndArray,
    ]);
    let expected = [
        (NumberEncoding::Text, [ScalarKind::Number, ScalarKind::Number]),
        (NumberEncoding::Native, [ScalarKind::Int64, ScalarKind::Double]),
        (NumberEncoding::Oracle, [ScalarKind::OraNumber, ScalarKind::OraNumber]),
    ];
    for (numbers, kinds) in expected {
        let options = EncodeOptions {
            numbers,
            ..EncodeOptions::default()
        };
        let image = encode_events(&mut events.clone(), &options).unwrap();
        let mut doc = Document::binary();
        let root = doc.load_from_binary_image(image).unwrap();
        for (i, kind) in kinds.iter().enumerate() {
            let node = doc.array_element(root, i).unwrap();
            assert_eq!(doc.scalar_info(node).unwrap().kind(), *kind, "{numbers:?}");
        }
    }
}

#[test]
fn encode_into_a_short_buffer() {
    let value = json!({"key": "value"});
    let full = encode_value(&value, &EncodeOptions::default()).unwrap();
    let mut small = [0u8; 8];
    let err = encode_into(
        &mut oson_dom::event::JsonValueSource::new(&value),
        &EncodeOptions::default(),
        &mut small,
    )
    .unwrap_err();
    assert_eq!(err, DomError::BufferTooSmall { required: full.len() });
    let mut big = vec![0u8; full.len() + 10];
    let used = encode_into(
        &mut oson_dom::event::JsonValueSource::new(&value),
        &EncodeOptions::default(),
        &mut big,
    )
    .unwrap();
    assert_eq!(&big[..used], full.as_slice());
}

#[test]
fn partial_updates_in_both_modes() {
    let value = json!({"user": {"name": "ann", "tags": ["x", "y"]}, "n": 1});
    let image = encode_value(&value, &EncodeOptions::default()).unwrap();
    let path = [Step::Field("user"), Step::Field("tags"), Step::Index(1)];
    let longer = "a replacement well past the inline limit";

    let mut strict = OsonPatcher::new(image.clone(), PatchMode::ReplaceOnly, None).unwrap();
    strict.replace(&path, ScalarValue::string("z")).unwrap();
    assert_eq!(
        strict
            .replace(&path, ScalarValue::string(longer))
            .unwrap_err()
            .kind(),
        ErrorKind::Unsupported
    );

    let mut general = OsonPatcher::new(image, PatchMode::General, None).unwrap();
    general.replace(&path, ScalarValue::string(longer)).unwrap();
    general.replace(&[Step::Field("n")], ScalarValue::Int64(2)).unwrap();
    let options = DomOptions::binary().with_flags(DomFlags::VALIDATE | DomFlags::VALIDATE_STRINGS);
    let mut doc = Document::new(options);
    let root = doc.load_from_binary_image(general.finish()).unwrap();
    assert_eq!(
        doc.to_json_value(root).unwrap(),
        json!({"user": {"name": "ann", "tags": ["x", longer]}, "n": 2})
    );

    let mut doc = Document::new(DomOptions::binary());
    let root = doc.load_from_binary_image(strict.finish()).unwrap();
    assert_eq!(
        doc.to_json_value(root).unwrap(),
        json!({"user": {"name": "ann", "tags": ["x", "z"]}, "n": 1})
    );
}

#[test]
fn patcher_follows_document_flags() {
    let image = encode_value(&json!({"s": "ab"}), &EncodeOptions::default()).unwrap();
    let path = [Step::Field("s")];
    let longer = ScalarValue::string("well beyond what fits inline here");

    let replace_only = DomOptions::binary().with_flags(DomFlags::PARTIAL_UPDATE_REPLACE_ONLY);
    let mut doc = Document::new(replace_only);
    doc.load_from_binary_image(image.clone()).unwrap();
    let mut patcher = OsonPatcher::from_document(&doc).unwrap();
    assert_eq!(
        patcher.replace(&path, longer.clone()).unwrap_err().kind(),
        ErrorKind::Unsupported
    );

    let mut doc = Document::binary();
    doc.load_from_binary_image(image).unwrap();
    let mut patcher = OsonPatcher::from_document(&doc).unwrap();
    patcher.replace(&path, longer).unwrap();

    assert_eq!(
        OsonPatcher::from_document(&Document::in_memory())
            .unwrap_err()
            .kind(),
        ErrorKind::Unsupported
    );
}

#[test]
fn corrupt_images_are_rejected_when_validating() {
    let image = encode_value(&json!({"a": [1, 2, 3]}), &EncodeOptions::default()).unwrap();
    for cut in [0, 3, 10, image.len() / 2, image.len() - 1] {
        let mut doc = Document::new(DomOptions::binary().with_flags(DomFlags::VALIDATE));
        let err = doc.load_from_binary_image(image[..cut].to_vec()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput, "cut at {cut}");
        assert!(doc.root_node().is_none());
    }
    let mut scalar_root = Document::new(DomOptions::binary().with_flags(DomFlags::DISALLOW_SCALARS));
    let image = encode_value(&json!(5), &EncodeOptions::default()).unwrap();
    assert!(scalar_root.load_from_binary_image(image).is_err());
}

#[test]
fn shared_dictionary_across_a_batch() {
    let dictionary = oson_dom::dom::SharedDictionary::new();
    let options = EncodeOptions {
        dictionary: Some(dictionary.clone()),
        ..EncodeOptions::default()
    };
    let rows = [json!({"id": 1, "name": "a"}), json!({"name": "b", "id": 2, "extra": true})];
    let images: Vec<Vec<u8>> = rows
        .iter()
        .map(|row| encode_value(row, &options).unwrap())
        .collect();
    assert_eq!(dictionary.read().len(), 3);

    for (row, image) in rows.iter().zip(images) {
        let mut without = Document::binary();
        assert_eq!(
            without.load_from_binary_image(image.clone()).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        let mut doc = Document::new(DomOptions::binary().with_dictionary(dictionary.clone()));
        let root = doc.load_from_binary_image(image).unwrap();
        assert_eq!(&doc.to_json_value(root).unwrap(), row);
    }
}
