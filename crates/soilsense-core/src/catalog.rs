//! Built-in crop rule table.
//!
//! Rules are listed most specific first because the engine stops at the
//! first match.

use crate::rules::{Conditions, CropRule, DefaultRecommendation, RuleBook};

fn set(items: &[&str]) -> Option<Vec<String>> {
    Some(items.iter().map(|s| (*s).to_string()).collect())
}

pub(crate) fn builtin() -> RuleBook {
    let rules = vec![
        CropRule::new("rice", &["Rice", "Paddy"])
            .localized(&["चावल", "धान"])
            .conditions(Conditions {
                ph_min: Some(5.5),
                ph_max: Some(7.5),
                moisture_min: Some(50.0),
                n_min: Some(40.0),
                p_min: Some(25.0),
                k_min: Some(40.0),
                weather: set(&["rainy", "humid"]),
                season: set(&["kharif"]),
                ..Default::default()
            }),
        CropRule::new("sugarcane", &["Sugarcane"])
            .localized(&["गन्ना"])
            .conditions(Conditions {
                ph_min: Some(6.0),
                ph_max: Some(7.5),
                moisture_min: Some(60.0),
                n_min: Some(50.0),
                k_min: Some(40.0),
                weather: set(&["hot", "humid", "rainy"]),
                season: set(&["kharif", "zaid"]),
                ..Default::default()
            }),
        CropRule::new("maize", &["Maize", "Corn"])
            .localized(&["मक्का"])
            .conditions(Conditions {
                ph_min: Some(5.5),
                ph_max: Some(7.5),
                moisture_min: Some(40.0),
                moisture_max: Some(70.0),
                n_min: Some(30.0),
                p_min: Some(20.0),
                k_min: Some(30.0),
                weather: set(&["sunny", "humid", "rainy"]),
                season: set(&["kharif"]),
                ..Default::default()
            }),
        CropRule::new("cotton", &["Cotton"])
            .localized(&["कपास"])
            .conditions(Conditions {
                ph_min: Some(6.0),
                ph_max: Some(8.0),
                moisture_min: Some(30.0),
                moisture_max: Some(60.0),
                n_min: Some(30.0),
                k_min: Some(30.0),
                weather: set(&["sunny", "hot", "dry"]),
                season: set(&["kharif"]),
                ..Default::default()
            }),
        CropRule::new("groundnut", &["Groundnut", "Peanut"])
            .localized(&["मूंगफली"])
            .conditions(Conditions {
                ph_min: Some(6.0),
                ph_max: Some(7.5),
                moisture_min: Some(25.0),
                moisture_max: Some(55.0),
                p_min: Some(20.0),
                weather: set(&["sunny", "dry"]),
                season: set(&["kharif"]),
                ..Default::default()
            }),
        CropRule::new("wheat", &["Wheat"])
            .localized(&["गेहूं"])
            .conditions(Conditions {
                ph_min: Some(6.0),
                ph_max: Some(7.5),
                moisture_min: Some(30.0),
                moisture_max: Some(60.0),
                n_min: Some(30.0),
                p_min: Some(20.0),
                k_min: Some(25.0),
                weather: set(&["cold", "sunny", "dry"]),
                season: set(&["rabi"]),
                ..Default::default()
            }),
        CropRule::new("chickpea", &["Chickpea", "Gram"])
            .localized(&["चना"])
            .conditions(Conditions {
                ph_min: Some(6.0),
                ph_max: Some(8.0),
                moisture_max: Some(45.0),
                p_min: Some(20.0),
                weather: set(&["cold", "dry"]),
                season: set(&["rabi"]),
                ..Default::default()
            }),
        CropRule::new("mustard", &["Mustard"])
            .localized(&["सरसों"])
            .conditions(Conditions {
                ph_min: Some(6.0),
                ph_max: Some(7.5),
                moisture_min: Some(20.0),
                moisture_max: Some(50.0),
                weather: set(&["cold", "dry", "sunny"]),
                season: set(&["rabi"]),
                ..Default::default()
            }),
        CropRule::new("melons", &["Watermelon", "Muskmelon"])
            .localized(&["तरबूज", "खरबूजा"])
            .conditions(Conditions {
                ph_min: Some(6.0),
                ph_max: Some(7.0),
                moisture_min: Some(30.0),
                moisture_max: Some(60.0),
                weather: set(&["hot", "sunny", "dry"]),
                season: set(&["zaid"]),
                ..Default::default()
            }),
        CropRule::new("moong", &["Moong", "Green Gram"])
            .localized(&["मूंग"])
            .conditions(Conditions {
                moisture_min: Some(25.0),
                weather: set(&["hot", "sunny"]),
                season: set(&["zaid"]),
                ..Default::default()
            }),
    ];

    RuleBook::new(
        rules,
        DefaultRecommendation {
            crops: vec!["Millet".to_string(), "Sorghum".to_string()],
            localized: vec!["बाजरा".to_string(), "ज्वार".to_string()],
        },
    )
}
