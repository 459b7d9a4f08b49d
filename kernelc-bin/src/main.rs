use anyhow::Result;
use clap::ArgMatches;
use clap::Args;
use clap::Command;
use clap::FromArgMatches;
use kernelc::init_subscriber;
use kernelc::DefaultCompiler;
use kernelc::Target;
use std::io::Read;
use tracing::Level;

/// Cross-compile a GPGPU kernel to GLSL ES 1.00, GLSL 4.50 or WGSL
#[derive(Args, Debug)]
#[command(version, about)]
struct KernelcArgs {
    /// The input file (- is interpreted as stdin)
    #[arg(default_value = "-")]
    input: String,
    /// Shading language to emit
    #[arg(long, value_enum, default_value_t = Target::Glsl450)]
    target: Target,
    /// Print a JSON bundle with the shaders for all targets
    #[arg(long)]
    bundle: bool,
    /// Dispatch size used when the kernel has no @dispatch attribute
    #[arg(long, value_name = "X,Y,Z", value_parser = parse_dispatch)]
    dispatch: Option<[u32; 3]>,
    /// Print debug logging to stderr
    #[arg(long)]
    debug: bool,
}

fn cli() -> Command {
    let cli = Command::new("kernelc");
    KernelcArgs::augment_args(cli)
}

/// Parse `X`, `X,Y` or `X,Y,Z`; missing sizes default to 1.
fn parse_dispatch(text: &str) -> Result<[u32; 3]> {
    let mut dispatch = [1, 1, 1];
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() > 3 {
        anyhow::bail!("Expected at most three sizes, got {}", parts.len());
    }
    for (i, part) in parts.iter().enumerate() {
        dispatch[i] = part.trim().parse()?;
    }
    Ok(dispatch)
}

fn run(args: &KernelcArgs, input_text: &str) -> Result<String> {
    let mut compiler = DefaultCompiler::with_target(args.target);
    if let Some(dispatch) = args.dispatch {
        compiler.set_dispatch(dispatch);
    }
    if args.bundle {
        let bundle = compiler.compile_bundle(input_text, &Target::ALL)?;
        bundle.to_json()
    } else {
        compiler.compile(input_text)
    }
}

fn read_input(input: &str) -> Result<String> {
    let input_text = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(input)?
    };
    Ok(input_text)
}

fn args_from(matches: &ArgMatches) -> Result<KernelcArgs> {
    Ok(KernelcArgs::from_arg_matches(matches)?)
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let args = args_from(&matches)?;
    if args.debug {
        let _ = init_subscriber(Level::DEBUG);
    }
    let input_text = read_input(&args.input)?;
    let result = run(&args, &input_text)?;
    println!("{result}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const KERNEL: &str = indoc! {"
        @numthreads(8)
        class Scale {
          @in @out
          data: float[];

          factor: float;

          @main
          compute() {
            const i = globalInvocationID.x;
            data[i] = data[i] * factor;
          }
        }
    "};

    fn run_app(args: Vec<&str>, input_text: &str) -> Result<String> {
        let matches = cli().try_get_matches_from(args)?;
        let args = args_from(&matches)?;
        run(&args, input_text)
    }

    #[test]
    fn test_help() {
        let args = vec!["kernelc", "--help"];
        let result = run_app(args, "");
        let err = match result {
            Ok(_) => panic!("Expected an error"),
            Err(e) => e,
        };
        let result = err.to_string();
        println!("{result}");
        assert!(result.contains("Usage: kernelc"));
        assert!(result.contains("--target"));
        assert!(result.contains("--bundle"));
    }

    #[test]
    fn test_parse_dispatch() {
        assert_eq!(parse_dispatch("4").unwrap(), [4, 1, 1]);
        assert_eq!(parse_dispatch("4, 2").unwrap(), [4, 2, 1]);
        assert_eq!(parse_dispatch("4,2,3").unwrap(), [4, 2, 3]);
        assert!(parse_dispatch("1,2,3,4").is_err());
        assert!(parse_dispatch("x").is_err());
    }

    #[test]
    fn test_default_target() {
        let result = run_app(vec!["kernelc"], KERNEL).unwrap();
        assert!(result.starts_with("#version 450"));
        assert!(result.contains("layout(local_size_x = 8, local_size_y = 1, local_size_z = 1) in;"));
    }

    #[test]
    fn test_wgsl_target() {
        let result = run_app(vec!["kernelc", "--target", "wgsl"], KERNEL).unwrap();
        assert!(result.contains("@compute @workgroup_size(8, 1, 1)"));
        assert!(run_app(vec!["kernelc", "--target", "hlsl"], KERNEL).is_err());
    }

    #[test]
    fn test_bundle() {
        let args = vec!["kernelc", "--bundle", "--dispatch", "2,1,1"];
        let result = run_app(args, KERNEL).unwrap();
        let bundle = kernelc::KernelBundle::from_json(&result).unwrap();
        assert_eq!(bundle.shaders.len(), 3);
        assert_eq!(bundle.context.dispatch, [2, 1, 1]);
        assert!(bundle.shader(Target::Glsl100).unwrap().contains("gl_FragColor"));
    }
}
