/// Bundling entry point. Usage:
///
///   cargo xtask bundle loveless-delay-v2 --release
///
/// Produces `target/bundled/Loveless Delay II.vst3` and `.clap`.
fn main() -> nih_plug_xtask::Result<()> {
    nih_plug_xtask::main()
}
