/*!
Abonnés scriptés

Commandes `sh` qui jouent le rôle de `bspc subscribe`: soit une liste de
rapports suivie d'EOF, soit un processus muet qui ne se termine jamais.
*/

/// Affiche chaque ligne puis ferme sa sortie
pub fn scripted_subscriber(lines: &[&str]) -> Vec<String> {
    let mut script = String::from("printf '%s\\n'");
    for line in lines {
        script.push(' ');
        script.push_str(&quote(line));
    }
    vec!["sh".to_string(), "-c".to_string(), script]
}

/// N'écrit rien et reste vivant jusqu'à ce qu'on le tue
pub fn silent_subscriber() -> Vec<String> {
    vec!["sleep".to_string(), "30".to_string()]
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}
