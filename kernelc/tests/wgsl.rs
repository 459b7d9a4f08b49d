extern crate kernelc;

use indoc::indoc;
use kernelc::tester::Tester;
use kernelc::Target;
use std::panic::Location;

const ADD_VECTORS: &str = indoc! {"
    import { globalInvocationID } from 'g-webgpu';

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
        vectorA[i] = this.sum(vectorA[i], vectorB[i]);
      }
    }
"};

#[test]
fn add_vectors() {
    Tester::init_tracing();
    let expected = indoc! {"
    @group(0) @binding(0) var<storage, read_write> vectorA: array<f32>;
    @group(0) @binding(1) var<storage, read> vectorB: array<f32>;
    var<private> globalInvocationID: vec3<i32>;

    fn sum(a: f32, b: f32) -> f32 {
      return (a + b);
    }

    @compute @workgroup_size(8, 1, 1)
    fn main(@builtin(global_invocation_id) global_invocation_id: vec3<u32>) {
      globalInvocationID = vec3<i32>(global_invocation_id);
      let i: i32 = globalInvocationID.x;
      vectorA[i] = sum(vectorA[i], vectorB[i]);
    }
    "};
    let (actual, context) = Tester::compile(Target::Wgsl, ADD_VECTORS);
    Tester::check_lines_exact(&actual, expected, Location::caller());
    assert!(context.need_pingpong);
}

#[test]
fn vector_literals() {
    Tester::init_tracing();
    let src = indoc! {"
    const ORIGIN = [0, 0, 1];

    function direction(): vec3 {
      let a = [1, 2, 3];
      return a + ORIGIN;
    }
    "};
    let expected = indoc! {"
    const ORIGIN: vec3<f32> = vec3<f32>(0.0, 0.0, 1.0);

    fn direction() -> vec3<f32> {
      var a: vec3<f32> = vec3<f32>(1.0, 2.0, 3.0);
      return (a + ORIGIN);
    }
    "};
    let (actual, _) = Tester::compile(Target::Wgsl, src);
    Tester::check_lines_exact(&actual, expected, Location::caller());
}

#[test]
fn loops_become_loop() {
    Tester::init_tracing();
    let src = indoc! {"
    function countdown(n: int): int {
      let j: int = n;
      while (j < 10) {
        j++;
      }
      do {
        j -= 2;
      } while (j > 0.0);
      return j;
    }
    "};
    let expected = indoc! {"
    fn countdown(n: i32) -> i32 {
      var j: i32 = n;
      loop {
        if (!(j < 10)) { break; }
        j = (j + 1);
      }
      loop {
        j = (j - 2);
        continuing {
          break if !(j > 0);
        }
      }
      return j;
    }
    "};
    let (actual, _) = Tester::compile(Target::Wgsl, src);
    Tester::check_lines_exact(&actual, expected, Location::caller());
}

#[test]
fn uniforms_and_builtins() {
    Tester::init_tracing();
    let src = indoc! {"
    import { globalInvocationID, localInvocationIndex, workGroupSize } from 'g-webgpu';

    @numthreads(4, 4)
    class Shade {
      @in
      scale: float;
      @out
      result: float[];

      @main
      compute() {
        const i = globalInvocationID.x + globalInvocationID.y * workGroupSize.x;
        result[i] = i > 3 ? scale : localInvocationIndex;
      }
    }
    "};
    let expected = indoc! {"
    struct KernelParams {
      scale: f32,
    }
    @group(0) @binding(0) var<uniform> kernelParams: KernelParams;
    @group(0) @binding(1) var<storage, read_write> result: array<f32>;
    var<private> globalInvocationID: vec3<i32>;
    var<private> workGroupSize: vec3<i32>;
    var<private> localInvocationIndex: i32;

    @compute @workgroup_size(4, 4, 1)
    fn main(@builtin(global_invocation_id) global_invocation_id: vec3<u32>, @builtin(local_invocation_index) local_invocation_index: u32) {
      globalInvocationID = vec3<i32>(global_invocation_id);
      workGroupSize = vec3<i32>(4, 4, 1);
      localInvocationIndex = i32(local_invocation_index);
      let i: i32 = (globalInvocationID.x + (globalInvocationID.y * workGroupSize.x));
      result[i] = select(f32(localInvocationIndex), kernelParams.scale, (i > 3));
    }
    "};
    let (actual, context) = Tester::compile(Target::Wgsl, src);
    Tester::check_lines_exact(&actual, expected, Location::caller());
    assert_eq!(context.uniform("scale").unwrap().binding, Some(0));
    assert!(context.uniform("result").unwrap().writeonly);
}

#[test]
fn assigned_parameters_are_copied() {
    Tester::init_tracing();
    let src = indoc! {"
    function bump(x: float, step: float): float {
      x = x + step;
      x++;
      return x;
    }
    "};
    let expected = indoc! {"
    fn bump(x_arg: f32, step: f32) -> f32 {
      var x: f32 = x_arg;
      x = (x + step);
      x = (x + 1.0);
      return x;
    }
    "};
    let (actual, _) = Tester::compile(Target::Wgsl, src);
    Tester::check_lines_exact(&actual, expected, Location::caller());
}
