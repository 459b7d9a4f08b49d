extern crate kernelc;

use indoc::indoc;
use kernelc::ir::DataType;
use kernelc::ir::NodeKind;
use kernelc::ir::ShaderProgram;
use kernelc::tester::Tester;
use kernelc::DiagnosticKind;
use kernelc::Target;
use std::panic::Location;

fn declared_type(program: &ShaderProgram, name: &str) -> DataType {
    program
        .iter()
        .find_map(|(_, node)| match &node.kind {
            NodeKind::VariableDeclarator { name: found, .. } if found == name => Some(node.typ),
            _ => None,
        })
        .unwrap()
}

#[test]
fn literal_types() {
    Tester::init_tracing();
    let src = indoc! {"
    function literals() {
      let a = 3;
      let b = true;
      let c = [1];
      let d = [1, 2];
      let e = [1, 2, 3, 4];
      let f = [true, false, true];
      let g = [1, 0, 0, 0, 1, 0, 0, 0, 1];
      let h = [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1];
      let i = [1, 2, 3, 4, 5];
    }
    "};
    let (program, _) = Tester::transform(src);
    let expected = [
        ("a", DataType::Float),
        ("b", DataType::Boolean),
        ("c", DataType::Float),
        ("d", DataType::Vector2Float),
        ("e", DataType::Vector4Float),
        ("f", DataType::Vector3Boolean),
        ("g", DataType::Matrix3x3Float),
        ("h", DataType::Matrix4x4Float),
        ("i", DataType::Float),
    ];
    for (name, typ) in expected {
        assert_eq!(declared_type(&program, name), typ, "type of {name}");
    }
}

#[test]
fn numeric_literals_have_a_decimal_point() {
    Tester::init_tracing();
    let src = indoc! {"
    function three(): float {
      let a = 3;
      return a * 2;
    }
    "};
    for (target, declaration) in [
        (Target::Glsl100, "float a = 3.0;"),
        (Target::Glsl450, "float a = 3.0;"),
        (Target::Wgsl, "var a: f32 = 3.0;"),
    ] {
        let (actual, _) = Tester::compile(target, src);
        let expected = format!("{declaration}\nreturn (a * 2.0);");
        Tester::check_lines_contain(&actual, &expected, Location::caller());
    }
}

#[test]
fn casts_are_not_repeated() {
    Tester::init_tracing();
    let src = indoc! {"
    function combine(a: int, b: float): int {
      let ab: int = a + b;
      let again: int = ab + b;
      return again;
    }
    "};
    for target in Target::ALL {
        let (actual, _) = Tester::compile(target, src);
        let cast = if target == Target::Wgsl { "i32" } else { "int" };
        assert!(actual.contains(&format!("(a + {cast}(b))")), "{target}");
        assert!(actual.contains(&format!("(ab + {cast}(b))")), "{target}");
        assert!(!actual.contains(&format!("{cast}({cast}(")), "{target}");
        assert!(!actual.contains(&format!("{cast}(a)")), "{target}");
    }
}

#[test]
fn thread_group_size() {
    Tester::init_tracing();
    let src = indoc! {"
    import { workGroupSize } from 'g-webgpu';

    @numthreads(2, 3, 4)
    class Grid {
      @out
      data: float[];

      @main
      compute() {
        data[0] = workGroupSize.z;
      }
    }
    "};
    let expectations = [
        (Target::Glsl100, "workGroupSize = ivec3(2, 3, 4);"),
        (
            Target::Glsl450,
            "layout(local_size_x = 2, local_size_y = 3, local_size_z = 4) in;",
        ),
        (Target::Wgsl, "@compute @workgroup_size(2, 3, 4)"),
    ];
    for (target, expected) in expectations {
        let (actual, context) = Tester::compile(target, src);
        Tester::check_lines_contain(&actual, expected, Location::caller());
        assert_eq!(context.thread_group_size, [2, 3, 4]);
    }
}

#[test]
fn pingpong_needs_input_and_output() {
    Tester::init_tracing();
    let single = indoc! {"
    class Single {
      @in
      source: float[];
      @out(100)
      target: float[];

      @main
      compute() {
      }
    }
    "};
    let (_, context) = Tester::transform(single);
    assert!(!context.need_pingpong);
    let output = context.output.unwrap();
    assert_eq!(output.name, "target");
    assert_eq!(output.length, Some(100));
    assert_eq!(output.size, Some([10, 10]));

    let both = single.replace("@in\n", "@in @out\n");
    let (_, context) = Tester::transform(&both);
    assert!(context.need_pingpong);
}

#[test]
fn unknown_constructs_are_skipped() {
    Tester::init_tracing();
    let src = indoc! {"
    function pick(x: float): float {
      switch (x) { default: break; }
      return x;
    }
    "};
    for target in Target::ALL {
        let (actual, context) = Tester::compile(target, src);
        assert!(!actual.contains("switch"), "{target}");
        assert!(actual.contains("return x;"), "{target}");
        let kinds: Vec<_> = context.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::UnknownConstruct], "{target}");
    }
}

#[test]
fn float_remainder_truncates() {
    Tester::init_tracing();
    let src = indoc! {"
    function wrap(a: float, b: float): float {
      return a % b + mod(a, b);
    }
    "};
    let expectations = [
        (
            Target::Glsl100,
            "return ((a - b * (sign(a / b) * floor(abs(a / b)))) + mod(a, b));",
        ),
        (Target::Glsl450, "return ((a - b * trunc(a / b)) + mod(a, b));"),
        (Target::Wgsl, "return ((a % b) + (a - b * floor(a / b)));"),
    ];
    for (target, expected) in expectations {
        let (actual, _) = Tester::compile(target, src);
        Tester::check_lines_contain(&actual, expected, Location::caller());
    }
}

#[test]
fn negative_unsigned_literals_wrap() {
    Tester::init_tracing();
    let src = indoc! {"
    function wrap(): uint {
      let x: uint = -1;
      return x;
    }
    "};
    let expectations = [
        (Target::Glsl100, "int x = -1;"),
        (Target::Glsl450, "uint x = 4294967295u;"),
        (Target::Wgsl, "var x: u32 = 4294967295u;"),
    ];
    for (target, expected) in expectations {
        let (actual, _) = Tester::compile(target, src);
        Tester::check_lines_contain(&actual, expected, Location::caller());
        assert!(!actual.contains("-1u"), "{target}");
    }
}
