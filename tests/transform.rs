//! End-to-end: marked source text in, instrumented source text out.

use hashp_swc_plugin::{transform_source, Config, Error};

fn transform(src: &str) -> String {
    transform_with(src, "input.js")
}

fn transform_with(src: &str, filename: &str) -> String {
    let out = transform_source(src, filename, &Config::default())
        .unwrap_or_else(|err| panic!("transform failed: {err}\n{src}"));
    assert!(!out.contains("__debug_"), "prefix leaked into output:\n{out}");
    out
}

fn assert_contains(out: &str, needle: &str) {
    assert!(out.contains(needle), "expected `{needle}` in:\n{out}");
}

// ---- declarations ----

#[test]
fn variable_declaration_logs_after_the_statement() {
    let out = transform("let #p count = 1;");
    assert_contains(&out, "let count = 1;");
    assert_contains(&out, r##"console.log("#p count => ", count);"##);
    assert!(out.find("let count").unwrap() < out.find("console.log").unwrap());
}

#[test]
fn declaration_with_expression_initializer() {
    let out = transform("let #p sum = 1 + 1;");
    assert_contains(&out, "let sum = 1 + 1;");
    assert_contains(&out, r##"console.log("#p sum => ", sum);"##);
}

#[test]
fn typed_declaration_keeps_annotation() {
    let out = transform_with("let #p n: number = 1;", "input.ts");
    assert_contains(&out, "let n: number = 1;");
    assert_contains(&out, r##"console.log("#p n => ", n);"##);
}

#[test]
fn destructuring_splits_through_a_temporary() {
    let out = transform("const { #p x, y } = { x: 11, y: 20 };");
    assert_contains(&out, "const _temp = {");
    assert_contains(&out, "const x = _temp.x;");
    assert_contains(&out, "const y = _temp.y;");
    assert_contains(&out, r##"console.log("#p x => ", x);"##);
    assert_eq!(out.matches("console.log").count(), 1, "{out}");
}

#[test]
fn temporary_name_avoids_user_bindings() {
    let out = transform("const _temp = 0;\nconst { #p x } = obj;");
    assert_contains(&out, "const _temp = 0;");
    assert_contains(&out, "const _temp2 = obj;");
    assert_contains(&out, "const x = _temp2.x;");
}

#[test]
fn exported_destructuring_keeps_bindings_exported() {
    let out = transform("export const { #p a, b } = obj;");
    assert_contains(&out, "const _temp = obj;");
    assert_contains(&out, "export const a = _temp.a;");
    assert_contains(&out, "export const b = _temp.b;");
    assert_contains(&out, r##"console.log("#p a => ", a);"##);
    assert!(!out.contains("export const _temp"), "{out}");
}

#[test]
fn destructuring_reads_properties_in_source_order() {
    let out = transform("const { a = 1, #p b, c: { d } } = obj;");
    let a = out.find("a = 1").unwrap();
    let b = out.find("const b = _temp.b;").unwrap();
    let d = out.find("c: {").unwrap();
    assert!(a < b && b < d, "{out}");
    assert_contains(&out, r##"console.log("#p b => ", b);"##);
}

#[test]
fn destructuring_with_rest_keeps_the_pattern() {
    let out = transform("const { #p a, ...rest } = obj;");
    assert_contains(&out, "const _temp = obj;");
    assert_contains(&out, "...rest");
    assert_contains(&out, r##"console.log("#p a => ", a);"##);
}

// ---- object and array literals ----

#[test]
fn object_property_value_is_wrapped() {
    let out = transform(r#"const obj = { name: "John", #p age: 3 };"#);
    assert_contains(&out, r#"name: "John""#);
    assert_contains(&out, r##"console.log("#p age => ", value);"##);
    assert_contains(&out, "age: ");
}

#[test]
fn nested_object_property() {
    let out = transform(r#"const user = { details: { #p id: 13, email: "user@example.com" } };"#);
    assert_contains(&out, r##"console.log("#p id => ", value);"##);
    assert_contains(&out, "user@example.com");
}

#[test]
fn shorthand_property_becomes_key_value() {
    let out = transform("const o = { #p a };");
    assert_contains(&out, "a: ");
    assert_contains(&out, r##"console.log("#p a => ", value);"##);
}

#[test]
fn marked_method_key_logs_undefined_before_statement() {
    let out = transform("const o = { #p run() { return 1; } };");
    assert_contains(&out, "run (");
    assert_contains(&out, r##"console.log("#p run => ", undefined);"##);
    assert!(out.find("console.log").unwrap() < out.find("const o").unwrap(), "{out}");
}

#[test]
fn marked_method_key_in_returned_object_is_logged_before_return() {
    let out = transform("function f() { return { #p run() { return 1; } }; }");
    let log = out.find(r##"console.log("#p run => ", undefined);"##).unwrap();
    let ret = out.find("return {").unwrap();
    assert!(log < ret, "{out}");
}

#[test]
fn array_element_literal_is_wrapped() {
    let out = transform("const arr = [1, 2, 3, #p 4, 5];");
    assert_contains(&out, "const arr = [");
    assert_contains(&out, r##"console.log("#p 4 => ", value);"##);
    assert_contains(&out, "(4)");
    assert!(out.find("(4)").unwrap() < out.rfind('5').unwrap(), "{out}");
}

#[test]
fn spread_argument_is_wrapped() {
    let out = transform("const newArr = [...#p arr, 6, 7, 8];");
    assert_contains(&out, "...((");
    assert_contains(&out, r##"console.log("#p arr => ", value);"##);
    assert_contains(&out, "(arr)");
    assert!(out.find("(arr)").unwrap() < out.rfind('8').unwrap(), "{out}");
}

// ---- functions ----

#[test]
fn parameter_logged_at_body_start() {
    let out = transform("function greet(#p name) { return name + '!'; }");
    assert_contains(&out, "function greet(name)");
    assert_contains(&out, r##"console.log("#p name => ", name);"##);
    assert_contains(&out, "return name + '!';");
    assert!(out.find("console.log").unwrap() < out.find("return").unwrap());
}

#[test]
fn default_parameter() {
    let out = transform("function welcome(#p name = \"12\") { console.log(`Welcome, ${name}!`); }");
    assert_contains(&out, r#"function welcome(name = "12")"#);
    assert_contains(&out, r##"console.log("#p name => ", name);"##);
}

#[test]
fn nested_parameter_patterns() {
    let out = transform("function f({ #p a, b: [#p c] }) { return a + c; }");
    assert_contains(&out, r##"console.log("#p a => ", a);"##);
    assert_contains(&out, r##"console.log("#p c => ", c);"##);
}

#[test]
fn parameter_log_follows_directives() {
    let out = transform("function f(#p a) { \"use strict\"; return a; }");
    let directive = out.find("\"use strict\"").unwrap();
    let log = out.find(r##"console.log("#p a => ", a)"##).unwrap();
    assert!(directive < log, "{out}");
}

#[test]
fn arrow_parameter_turns_expression_body_into_block() {
    let out = transform("const f = (#p x) => x * 2;");
    assert_contains(&out, r##"console.log("#p x => ", x);"##);
    assert_contains(&out, "return x * 2;");
}

#[test]
fn typescript_parameter_property() {
    let out = transform_with("class User { constructor(private #p name: string) {} }", "input.ts");
    assert_contains(&out, "private name: string");
    assert_contains(&out, r##"console.log("#p name => ", name);"##);
}

#[test]
fn return_value_call_form() {
    let out = transform("function calculateArea(width, height) { return #p (width * height); }");
    assert_contains(&out, "function calculateArea(width, height)");
    assert_contains(&out, r##"console.log("#p (width * height) => ", value);"##);
}

#[test]
fn returned_name_is_renamed_only() {
    let out = transform("function id(v) { return #p v; }");
    assert_contains(&out, "return v;");
    assert!(!out.contains("console.log"), "{out}");
}

#[test]
fn arrow_body_name_is_renamed_only() {
    let out = transform("const id = (y) => #p y;");
    assert_contains(&out, "=>y");
    assert!(!out.contains("console.log"), "{out}");
}

#[test]
fn arrow_body_call_form() {
    let out = transform("const double = (x) => #p (x * 2 - 1);");
    assert_contains(&out, "const double =");
    assert_contains(&out, r##"console.log("#p (x * 2 - 1) => ", value);"##);
}

#[test]
fn arrow_in_object_property() {
    let out = transform("const calculator = { add: (a, b) => #p (a + b), };");
    assert_contains(&out, "const calculator = {");
    assert_contains(&out, r##"console.log("#p (a + b) => ", value);"##);
}

#[test]
fn arrow_passed_to_array_method() {
    let out = transform("const doubled = numbers.map(n => #p (n + 1));");
    assert_contains(&out, "const doubled = numbers.map(");
    assert_contains(&out, r##"console.log("#p (n + 1) => ", value);"##);
}

#[test]
fn async_return_value() {
    let out = transform(
        "async function fetchData() { const response = await fetch('url'); return #p (await response.json()); }",
    );
    assert_contains(&out, "async function fetchData()");
    assert_contains(&out, r##"console.log("#p (await response.json()) => ", value);"##);
}

// ---- expressions ----

#[test]
fn conditional_call_form() {
    let out = transform(r#"const isEven = #p (count === 1 ? 7 : "wrong");"#);
    assert_contains(&out, "const isEven =");
    assert_contains(&out, "#p (count === 1 ? 7 : ");
    assert_contains(&out, "wrong");
}

#[test]
fn ternary_call_form() {
    let out = transform(r#"const status = #p (isEven ? "Even" : "Odd");"#);
    assert_contains(&out, "const status =");
    assert_contains(&out, "#p (isEven ? ");
}

#[test]
fn template_literal_interpolation() {
    let out = transform("const message = `The count is ${#p (count + 7)}`;");
    assert_contains(&out, "const message = `The count is ${");
    assert_contains(&out, r##"console.log("#p (count + 7) => ", value);"##);
}

#[test]
fn nested_call_forms_label_as_written() {
    let out = transform("const result = #p (1 + #p (9 * 2));");
    assert_contains(&out, "const result =");
    let inner = out.find(r##"console.log("#p (9 * 2) => ", value);"##);
    let outer = out.find(r##"console.log("#p (1 + (9 * 2)) => ", value);"##);
    // the inner construct is printed inside the outer one's argument
    assert!(matches!((outer, inner), (Some(o), Some(i)) if o < i), "{out}");
}

#[test]
fn member_object_inside_tagged_template_helper() {
    let out = transform(
        "
      function debug(strings, ...values) {
        return strings.reduce((acc, str, i) =>
          acc + str + (#p values[i] || ''), '');
      }
      const debugMessage = debug`Count: ${count}, Sum: ${sum}`;
    ",
    );
    assert_contains(&out, "function debug(strings, ...values)");
    assert_contains(&out, r##"console.log("#p values => ", value);"##);
    assert_contains(&out, "const debugMessage = debug`Count: ${count}, Sum: ${sum}`;");
}

#[test]
fn marked_member_property_wraps_the_access() {
    let out = transform("const v = obj.#p field;");
    assert_contains(&out, r##"console.log("#p field => ", value);"##);
    assert_contains(&out, "(obj.field)");
}

#[test]
fn property_wrapping_a_call_keeps_the_call_in_enclosing_label() {
    let out = transform("const r = #p ({ #p total: sum(items) });");
    assert_contains(&out, r##"console.log("#p total => ", value);"##);
    // only the outer label spells the property as written
    assert_contains(&out, "total: sum(items)");
}

#[test]
fn property_wrapping_a_call_form_keeps_its_parentheses() {
    let out = transform("const r = #p ({ #p a: #p (x) });");
    assert_contains(&out, r##"console.log("#p (x) => ", value);"##);
    assert_contains(&out, r##"console.log("#p a => ", value);"##);
    assert_contains(&out, "a: (x)");
}

#[test]
fn wrapped_expression_is_evaluated_once() {
    let out = transform("const r = #p (next());");
    // once in the label, once as the argument
    assert_eq!(out.matches("next()").count(), 2, "{out}");
}

#[test]
fn empty_call_form_logs_undefined() {
    let out = transform("f(#p ());");
    assert_contains(&out, r##"console.log("#p empty debug call => ", value);"##);
    assert_contains(&out, "(undefined)");
}

#[test]
fn several_arguments_are_kept_as_a_sequence() {
    let out = transform("const s = #p (a, b);");
    assert_contains(&out, r##""#p (a, b) => ""##);
    assert_contains(&out, "((a, b))");
}

// ---- classes ----

#[test]
fn class_property_initializer() {
    let out = transform("class Counter { #p count = 17; increment() { this.count++; } }");
    assert_contains(&out, "class Counter {");
    assert_contains(&out, r##"console.log("#p count => ", value);"##);
    assert_contains(&out, "this.count++");
}

// ---- rename-only positions ----

#[test]
fn callee_is_renamed_only() {
    let out = transform("#p run();");
    assert_contains(&out, "run();");
    assert!(!out.contains("console.log"), "{out}");
}

#[test]
fn update_target_is_renamed_only() {
    let out = transform("let i = 0;\n#p i++;");
    assert_contains(&out, "i++;");
    assert!(!out.contains("console.log"), "{out}");
}

#[test]
fn interface_members_are_renamed_only() {
    let out = transform_with("interface Props { #p size: number }", "input.ts");
    assert_contains(&out, "size: number");
    assert!(!out.contains("console.log"), "{out}");
}

// ---- surroundings ----

#[test]
fn unmarked_prefix_identifier_is_left_alone() {
    let out = transform_source(
        "const __debug_x = 1;\nlet #p y = __debug_x;",
        "input.js",
        &Config::default(),
    )
    .unwrap();
    assert_contains(&out, "const __debug_x = 1;");
    assert_contains(&out, "let y = __debug_x;");
    assert_contains(&out, r##"console.log("#p y => ", y);"##);
}

#[test]
fn comments_survive() {
    let out = transform("// keep me\nlet #p a = 1;");
    assert_contains(&out, "// keep me");
    assert_contains(&out, "let a = 1;");
}

#[test]
fn jsx_expression_container() {
    let out = transform_with("const el = <div>{#p label}</div>;", "input.tsx");
    assert_contains(&out, r##"console.log("#p label => ", value);"##);
    assert_contains(&out, "<div>");
}

#[test]
fn custom_logger() {
    let config = Config {
        logger: "window.dbg.log".into(),
        ..Config::default()
    };
    let out = transform_source("let #p a = 1;", "input.js", &config).unwrap();
    assert_contains(&out, r##"window.dbg.log("#p a => ", a);"##);
}

#[test]
fn custom_marker() {
    let config = Config {
        marker: "@dbg".into(),
        ..Config::default()
    };
    let out = transform_source("let @dbg a = 1;", "input.js", &config).unwrap();
    assert_contains(&out, r##"console.log("@dbg a => ", a);"##);
}

// ---- errors ----

#[test]
fn dangling_marker_is_reported_at_the_marker() {
    let err = transform_source("let x = #p ;", "input.js", &Config::default()).unwrap_err();
    assert!(
        matches!(err, Error::DanglingMarker { line: 1, col: 9 }),
        "{err:?}"
    );
}

#[test]
fn dangling_marker_on_a_later_line() {
    let err = transform_source("let a = 1;\nlet x = #p ;", "input.js", &Config::default())
        .unwrap_err();
    assert!(
        matches!(err, Error::DanglingMarker { line: 2, col: 9 }),
        "{err:?}"
    );
}

#[test]
fn unparsable_marker_is_a_parse_error() {
    let err = transform_source("let x = #p );", "broken.js", &Config::default()).unwrap_err();
    match err {
        Error::Parse { file, line, .. } => {
            assert_eq!(file, "broken.js");
            assert_eq!(line, 1);
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn invalid_config_is_rejected() {
    let config = Config {
        prefix: "1bad".into(),
        ..Config::default()
    };
    let err = transform_source("let a = 1;", "input.js", &config).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "{err:?}");
}
