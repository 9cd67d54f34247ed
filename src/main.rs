fn main() -> anyhow::Result<()> {
    herd::run()
}
