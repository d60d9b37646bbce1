//! Curated PIN prefix to locality table.
//!
//! Consulted when a three to five digit query has no postal entries, so that
//! typing the start of a well-known PIN still suggests somewhere sensible.

const PREFIX_LOCALITIES: &[(&str, &[&str])] = &[
    // Metros
    ("110", &["New Delhi", "Delhi"]),
    ("400", &["Mumbai", "Mumbai Suburban", "Thane", "Navi Mumbai"]),
    ("560", &["Bengaluru"]),
    ("500", &["Hyderabad", "Secunderabad"]),
    ("700", &["Kolkata"]),
    ("600", &["Chennai"]),
    // North
    ("208", &["Kanpur", "Kanpur Nagar"]),
    ("211", &["Prayagraj", "Allahabad"]),
    ("212", &["Fatehpur"]),
    ("201", &["Noida", "Ghaziabad", "Greater Noida"]),
    ("122", &["Gurugram (Gurgaon)"]),
    ("226", &["Lucknow"]),
    ("221", &["Varanasi"]),
    ("282", &["Agra"]),
    ("250", &["Meerut"]),
    ("243", &["Bareilly"]),
    ("160", &["Chandigarh"]),
    ("141", &["Ludhiana"]),
    ("143", &["Amritsar"]),
    ("121", &["Faridabad"]),
    ("190", &["Srinagar"]),
    ("302", &["Jaipur"]),
    ("342", &["Jodhpur"]),
    ("324", &["Kota"]),
    // West
    ("380", &["Ahmedabad"]),
    ("395", &["Surat"]),
    ("390", &["Vadodara"]),
    ("360", &["Rajkot"]),
    ("411", &["Pune"]),
    ("412", &["Pune District", "Pimpri-Chinchwad"]),
    ("440", &["Nagpur"]),
    ("422", &["Nashik"]),
    ("431", &["Chhatrapati Sambhajinagar (Aurangabad)"]),
    ("401", &["Vasai-Virar", "Palghar"]),
    // Central
    ("452", &["Indore"]),
    ("462", &["Bhopal"]),
    ("474", &["Gwalior"]),
    ("482", &["Jabalpur"]),
    ("492", &["Raipur"]),
    // East
    ("800", &["Patna"]),
    ("831", &["Jamshedpur"]),
    ("826", &["Dhanbad"]),
    ("751", &["Bhubaneswar"]),
    ("781", &["Guwahati"]),
    // South
    ("530", &["Visakhapatnam"]),
    ("520", &["Vijayawada"]),
    ("641", &["Coimbatore"]),
    ("625", &["Madurai"]),
    ("620", &["Tiruchirappalli"]),
    ("695", &["Thiruvananthapuram"]),
    ("682", &["Kochi", "Ernakulam"]),
    ("570", &["Mysuru"]),
];

/// Localities for the first three characters of `prefix`, empty when unknown.
pub fn localities(prefix: &str) -> &'static [&'static str] {
    let Some(key) = prefix.get(..super::PREFIX_LENGTH) else {
        return &[];
    };
    PREFIX_LOCALITIES
        .iter()
        .find(|(p, _)| *p == key)
        .map_or(&[], |(_, names)| names)
}

/// Strips a trailing parenthesised alias: `"Gurugram (Gurgaon)"` -> `"Gurugram"`.
pub fn primary_name(locality: &str) -> &str {
    locality
        .split_once(" (")
        .map_or(locality, |(name, _)| name)
        .trim()
}
