/// Maps a free-text country to an ISO-2 code.
///
/// Known names and codes go through a fixed table. Anything else falls back to
/// its first two letters, uppercased, which is only a guess. Returns `None`
/// when the input has no letters at all.
pub fn country_code(raw: &str) -> Option<String> {
    let key = raw
        .to_lowercase()
        .replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if let Some(code) = known_country(&key) {
        return Some(code.to_string());
    }

    let letters: String = key
        .chars()
        .filter(|c| c.is_alphabetic())
        .take(2)
        .collect::<String>()
        .to_uppercase();

    if letters.is_empty() {
        None
    } else {
        Some(letters)
    }
}

fn known_country(key: &str) -> Option<&'static str> {
    let code = match key {
        "uk" | "gb" | "united kingdom" | "great britain" | "britain" | "england" => "GB",
        "us" | "usa" | "united states" | "united states of america" | "america" => "US",
        "au" | "australia" => "AU",
        "cy" | "cyprus" => "CY",
        "de" | "germany" => "DE",
        "ie" | "ireland" => "IE",
        "nl" | "netherlands" | "the netherlands" | "holland" => "NL",
        "lu" | "luxembourg" => "LU",
        "mt" | "malta" => "MT",
        "sg" | "singapore" => "SG",
        "hk" | "hong kong" => "HK",
        "jp" | "japan" => "JP",
        "ca" | "canada" => "CA",
        "za" | "south africa" => "ZA",
        "sc" | "seychelles" => "SC",
        "mu" | "mauritius" => "MU",
        "ae" | "uae" | "united arab emirates" | "dubai" => "AE",
        "ch" | "switzerland" => "CH",
        "fr" | "france" => "FR",
        "pl" | "poland" => "PL",
        "bz" | "belize" => "BZ",
        "nz" | "new zealand" => "NZ",
        "in" | "india" => "IN",
        "es" | "spain" => "ES",
        "it" | "italy" => "IT",
        "dk" | "denmark" => "DK",
        "se" | "sweden" => "SE",
        "at" | "austria" => "AT",
        "be" | "belgium" => "BE",
        "cz" | "czech republic" | "czechia" => "CZ",
        "il" | "israel" => "IL",
        "bs" | "bahamas" | "the bahamas" => "BS",
        "ky" | "cayman islands" => "KY",
        "vg" | "bvi" | "british virgin islands" => "VG",
        "vu" | "vanuatu" => "VU",
        "vc" | "st vincent" | "st vincent and the grenadines" | "saint vincent and the grenadines" => "VC",
        _ => return None,
    };
    Some(code)
}
