fn main() -> anyhow::Result<()> {
    turntable::run()
}
