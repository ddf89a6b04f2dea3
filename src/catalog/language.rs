// SPDX-License-Identifier: GPL-3.0-only

catalog_enum! {
    /// Languages with a published text map
    pub enum Language {
        SimplifiedChinese => "chs",
        TraditionalChinese => "cht",
        German => "de",
        English => "en",
        Spanish => "es",
        French => "fr",
        Indonesian => "id",
        Japanese => "jp",
        Korean => "kr",
        Portuguese => "pt",
        Russian => "ru",
        Thai => "th",
        Vietnamese => "vi",
    }
}
