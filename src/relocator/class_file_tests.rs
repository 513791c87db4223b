//! Unit tests for constant pool rewriting.

use super::*;
use crate::relocator::RelocationRule;
use crate::test_support::{ClassFileBuilder, class_strings};
use rstest::{fixture, rstest};

#[fixture]
fn rules() -> RuleSet {
    RuleSet::new(vec![
        RelocationRule::parse("com.google", "shaded.com.google").expect("valid rule"),
        RelocationRule::parse("okio", "shaded.okio").expect("valid rule"),
    ])
    .expect("no conflicts")
}

fn relocated_strings(bytes: &[u8], rules: &RuleSet) -> Vec<String> {
    let relocated = relocate_class(bytes, rules)
        .expect("class parses")
        .expect("class changed");
    class_strings(&relocated)
}

#[rstest]
fn class_names_and_descriptors_are_rewritten(rules: RuleSet) {
    let bytes = ClassFileBuilder::new("com/google/common/base/Strings")
        .implements("com/google/common/base/Function")
        .field("cache", "Lcom/google/common/cache/Cache;")
        .method("apply", "(ILcom/google/common/base/Optional;[Lokio/Buffer;)Ljava/lang/String;")
        .build();
    let strings = relocated_strings(&bytes, &rules);

    assert!(strings.contains(&"shaded/com/google/common/base/Strings".to_owned()));
    assert!(strings.contains(&"shaded/com/google/common/base/Function".to_owned()));
    assert!(strings.contains(&"Lshaded/com/google/common/cache/Cache;".to_owned()));
    assert!(strings.contains(
        &"(ILshaded/com/google/common/base/Optional;[Lshaded/okio/Buffer;)Ljava/lang/String;"
            .to_owned()
    ));
    assert!(strings.contains(&"java/lang/Object".to_owned()));
}

#[rstest]
fn member_names_are_never_rewritten(rules: RuleSet) {
    let bytes = ClassFileBuilder::new("com/google/Foo")
        .method("okio", "()V")
        .field("com", "I")
        .build();
    let strings = relocated_strings(&bytes, &rules);
    assert!(strings.contains(&"okio".to_owned()));
    assert!(strings.contains(&"com".to_owned()));
}

#[rstest]
fn name_and_type_names_survive_references(rules: RuleSet) {
    let bytes = ClassFileBuilder::new("org/example/Caller")
        .method_ref("com/google/common/Foo", "okio", "(Lcom/google/Bar;)V")
        .build();
    let strings = relocated_strings(&bytes, &rules);
    assert!(strings.contains(&"shaded/com/google/common/Foo".to_owned()));
    assert!(strings.contains(&"okio".to_owned()));
    assert!(strings.contains(&"(Lshaded/com/google/Bar;)V".to_owned()));
}

#[rstest]
#[case::dotted("com.google.common.base.Strings", "shaded.com.google.common.base.Strings")]
#[case::slashed("com/google/common/config.properties", "shaded/com/google/common/config.properties")]
#[case::bare_package("okio", "shaded.okio")]
fn qualified_string_literals_are_rewritten(
    rules: RuleSet,
    #[case] literal: &str,
    #[case] expected: &str,
) {
    let bytes = ClassFileBuilder::new("org/example/Loader")
        .string_literal(literal)
        .build();
    let strings = relocated_strings(&bytes, &rules);
    assert!(strings.contains(&expected.to_owned()), "{strings:?}");
}

#[rstest]
#[case("Loading com.google.common.base.Strings now")]
#[case("com.googlex.Foo")]
#[case("see http://com.google/docs")]
fn prose_literals_are_left_alone(rules: RuleSet, #[case] literal: &str) {
    let bytes = ClassFileBuilder::new("org/example/Loader")
        .string_literal(literal)
        .build();
    assert_eq!(relocate_class(&bytes, &rules).expect("class parses"), None);
}

#[rstest]
fn generic_signatures_are_rewritten(rules: RuleSet) {
    let signature = concat!(
        "<K:Ljava/lang/Object;V::Lcom/google/common/base/Supplier<TK;>;>",
        "Lcom/google/common/collect/ForwardingMap<TK;+Lokio/Buffer;>.Inner<*>;",
        "Ljava/io/Serializable;"
    );
    let bytes = ClassFileBuilder::new("org/example/Map")
        .signature(signature)
        .build();
    let strings = relocated_strings(&bytes, &rules);
    let expected = concat!(
        "<K:Ljava/lang/Object;V::Lshaded/com/google/common/base/Supplier<TK;>;>",
        "Lshaded/com/google/common/collect/ForwardingMap<TK;+Lshaded/okio/Buffer;>.Inner<*>;",
        "Ljava/io/Serializable;"
    );
    assert!(strings.contains(&expected.to_owned()), "{strings:?}");
}

#[rstest]
fn wide_constants_keep_pool_indices_aligned(rules: RuleSet) {
    let bytes = ClassFileBuilder::new("com/google/Wide")
        .long_constant(42)
        .field("value", "Lokio/Buffer;")
        .build();
    let strings = relocated_strings(&bytes, &rules);
    assert!(strings.contains(&"Lshaded/okio/Buffer;".to_owned()));
    assert!(strings.contains(&"value".to_owned()));
}

#[rstest]
fn relocation_is_idempotent(rules: RuleSet) {
    let bytes = ClassFileBuilder::new("com/google/Foo")
        .field("buffer", "Lokio/Buffer;")
        .string_literal("com.google.Foo")
        .build();
    let once = relocate_class(&bytes, &rules)
        .expect("parses")
        .expect("changed");
    assert_eq!(relocate_class(&once, &rules).expect("parses"), None);
}

#[rstest]
fn untouched_classes_report_no_change(rules: RuleSet) {
    let bytes = ClassFileBuilder::new("org/example/Plain")
        .field("name", "Ljava/lang/String;")
        .build();
    assert_eq!(relocate_class(&bytes, &rules).expect("parses"), None);
}

#[rstest]
#[case::bad_magic(vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9])]
#[case::empty(Vec::new())]
fn malformed_classes_are_errors(rules: RuleSet, #[case] bytes: Vec<u8>) {
    assert!(relocate_class(&bytes, &rules).is_err());
}

#[rstest]
fn truncated_classes_are_errors(rules: RuleSet) {
    let bytes = ClassFileBuilder::new("com/google/Foo").build();
    let truncated = bytes.get(..bytes.len() - 3).expect("long enough");
    assert!(matches!(
        relocate_class(truncated, &rules),
        Err(ClassFileError::Truncated { .. })
    ));
}

#[rstest]
#[case("(I)V", None)]
#[case("[[Lcom/google/Foo;", Some("[[Lshaded/com/google/Foo;"))]
#[case("(TT;)TT;", None)]
#[case("()V^Lcom/google/Failure;", Some("()V^Lshaded/com/google/Failure;"))]
#[case("Lcom/google/Foo", None)]
#[case("List", None)]
fn descriptors_parse_by_grammar(rules: RuleSet, #[case] text: &str, #[case] expected: Option<&str>) {
    assert_eq!(relocate_descriptor(text, &rules).as_deref(), expected);
}
