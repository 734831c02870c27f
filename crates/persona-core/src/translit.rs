//! Cyrillic to Latin transliteration for Russian names

/// Latin spelling of one lowercase Russian letter
fn latin_for(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' => "'",
        'ы' => "y",
        'ь' => "'",
        'э' => "e",
        'ю' => "ju",
        'я' => "ja",
        _ => return None,
    };
    Some(latin)
}

/// Transliterate Russian text into Latin script.
///
/// Hard and soft signs become apostrophes; other characters pass through.
/// An uppercase letter capitalises the first letter of its Latin spelling.
pub fn to_latin(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let lower = c.to_lowercase().next().unwrap_or(c);
        match latin_for(lower) {
            Some(latin) if lower != c => {
                let mut letters = latin.chars();
                if let Some(first) = letters.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(letters.as_str());
                }
            }
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}
