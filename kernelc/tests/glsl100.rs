extern crate kernelc;

use indoc::indoc;
use kernelc::tester::Tester;
use kernelc::DefineValue;
use kernelc::Target;
use std::panic::Location;

const ADD_VECTORS: &str = indoc! {"
    import { globalInvocationID } from 'g-webgpu';

    const AAA = 10;

    @numthreads(8, 1, 1)
    class Add {
      @in @out
      vectorA: float[];
      @in
      vectorB: float[];

      sum(a: float, b: float): float {
        return a + b;
      }

      @main
      compute() {
        const i = globalInvocationID.x;
        vectorA[i] = this.sum(vectorA[i], vectorB[i]) + AAA;
      }
    }
"};

#[test]
fn add_vectors() {
    Tester::init_tracing();
    let expected = indoc! {"
    #ifdef GL_FRAGMENT_PRECISION_HIGH
      precision highp float;
    #else
      precision mediump float;
    #endif
    #define AAA 10.0
    uniform vec2 u_OutputTextureSize;
    uniform int u_OutputTexelCount;
    varying vec2 v_TexCoord;
    int imod(int x, int y) {
    vec2 addrTranslation_1Dto2D(float address1D, vec2 texSize) {
    uniform sampler2D vectorA;
    uniform vec2 vectorASize;
    vec4 getDataVectorA(vec2 address2D) {
    vec4 getDataVectorA(float address1D) {
    vec4 getDataVectorA(int address1D) {
    uniform sampler2D vectorB;
    vec4 getDataVectorB(int address1D) {
    ivec3 globalInvocationID;
    int localInvocationIndex;

    float sum(float a, float b) {
      return (a + b);
    }

    void main() {
      int texelIndex = int(floor(v_TexCoord.x * u_OutputTextureSize.x)) + int(floor(v_TexCoord.y * u_OutputTextureSize.y)) * int(u_OutputTextureSize.x);
      if (texelIndex >= u_OutputTexelCount) {
        discard;
      }
      globalInvocationID = ivec3(imod(texelIndex, 8), imod(texelIndex / 8, 1), texelIndex / 8);
      int i = globalInvocationID.x;
      gl_FragColor = vec4((sum(getDataVectorA(i).r, getDataVectorB(i).r) + AAA));
    }
    "};
    let (actual, context) = Tester::compile(Target::Glsl100, ADD_VECTORS);
    Tester::check_lines_contain(&actual, expected, Location::caller());
    assert!(context.need_pingpong);
    assert_eq!(context.output.as_ref().unwrap().name, "vectorA");

    let define = context.define("AAA").unwrap();
    assert_eq!(define.value, DefineValue::Number(10.0));
    assert!(!define.runtime);
}

#[test]
fn vector_literals() {
    Tester::init_tracing();
    let src = indoc! {"
    function direction(flag: bool): vec3 {
      let a = [1, 2, 3];
      let b = [true, false];
      return flag ? a : normalize(a);
    }
    "};
    let expected = indoc! {"
    vec3 direction(bool flag) {
      vec3 a = vec3(1.0, 2.0, 3.0);
      bvec2 b = bvec2(true, false);
      return (flag ? a : normalize(a));
    }
    "};
    let (actual, _) = Tester::compile(Target::Glsl100, src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

#[test]
fn unsigned_and_remainder() {
    Tester::init_tracing();
    let src = indoc! {"
    function wrap(n: uint, x: float): float {
      let m: uint = n % 4;
      return mod(x, 2) + m;
    }
    "};
    let expected = indoc! {"
    float wrap(int n, float x) {
      int m = imod(n, 4);
      return float((int(mod(x, 2.0)) + m));
    }
    "};
    let (actual, _) = Tester::compile(Target::Glsl100, src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
    assert!(!actual.contains("uint"));
}

#[test]
fn update_on_output_writes_fragment() {
    Tester::init_tracing();
    let src = indoc! {"
    import { globalInvocationID } from 'g-webgpu';

    class Count {
      @in @out
      data: float[];

      @main
      compute() {
        const i = globalInvocationID.x;
        data[i]++;
      }
    }
    "};
    let expected = indoc! {"
      int i = globalInvocationID.x;
      gl_FragColor = vec4((getDataData(i).r + 1.0));
    }
    "};
    let (actual, _) = Tester::compile(Target::Glsl100, src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
    assert!(!actual.contains("++"));
}
