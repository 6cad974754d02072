fn main() -> anyhow::Result<()> {
    toon_flight::run(toon_flight::SceneConfig::default())
}
