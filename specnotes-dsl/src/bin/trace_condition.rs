/// Condition Tracer - Shows the flow through Lexer → Parser → AST → Evaluation
///
/// Usage: cargo run --bin trace_condition '<condition>' [field=value ...]

use specnotes_core::Fields;
use specnotes_dsl::{pretty_print, Condition, Lexer, TokenKind};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run --bin trace_condition '<condition>' [field=value ...]");
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --bin trace_condition 'sour && !toxic' sour=true toxic=false");
        std::process::exit(1);
    }

    let source = &args[1];

    println!("╔═══════════════════════════════════════════════════════════════");
    println!("║ CONDITION TRACER");
    println!("╚═══════════════════════════════════════════════════════════════\n");

    println!("📝 INPUT:");
    println!("{}", source);
    println!();

    println!("🔤 TOKENS:");
    let mut lexer = Lexer::new(source);
    for token in lexer.tokenize() {
        let marker = if matches!(token.kind, TokenKind::Error(_)) { "❌" } else { "  " };
        println!(
            "{} {}:{} {}",
            marker, token.span.line, token.span.column, token.kind
        );
    }
    println!();

    let condition = Condition::compile(source.as_str());
    match condition.expr() {
        Some(expr) => {
            println!("🌳 AST:");
            println!("{:#?}", expr);
            println!();
            println!("🖨  CANONICAL:");
            println!("{}", pretty_print(expr));
            println!();
        }
        None => {
            let validation = condition.validation();
            println!("❌ INVALID: {}", validation.message);
            println!();
        }
    }

    let pairs: Vec<(String, String)> = args[2..]
        .iter()
        .filter_map(|arg| {
            arg.split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
        })
        .collect();
    let fields = Fields::from_raw(pairs);

    println!("📋 FIELDS:");
    for (name, value) in fields.iter() {
        println!("  {} = {:?}", name, value);
    }
    println!();

    println!("✅ RESULT: {}", condition.matches(&fields));
}
