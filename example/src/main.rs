use voice_translate_client::{Config, TranslationClient};

fn main() {
    env_logger::init();

    let cfg = Config::from_env().unwrap();
    let client = TranslationClient::new(cfg).unwrap();

    match client.translate("en", "es", "  Hola   mundo ") {
        Ok(text) => println!("{text}"),
        Err(e) if e.is_cancelled() => {}
        Err(e) => eprintln!("Translation unavailable: {e}"),
    }

    let translated = client
        .translate_multiple(&["Buenos días", "Adiós", "Buenos días"], "en", "es")
        .unwrap();
    println!("{translated:?}");

    let lang = client.detect_language("Bonjour tout le monde").unwrap();
    println!("Detected: {lang}");
}
