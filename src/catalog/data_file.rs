// SPDX-License-Identifier: GPL-3.0-only

catalog_enum! {
    /// Excel config data exports that can be mirrored
    pub enum DataFile {
        // Characters
        CharacterData => "AvatarExcelConfigData",
        CharacterProfile => "FetterInfoExcelConfigData",
        CharacterCostume => "AvatarCostumeExcelConfigData",
        CharacterSkillDepot => "AvatarSkillDepotExcelConfigData",
        CharacterSkill => "AvatarSkillExcelConfigData",
        CharacterTalent => "ProudSkillExcelConfigData",
        CharacterConstellation => "AvatarTalentExcelConfigData",
        CharacterAscension => "AvatarPromoteExcelConfigData",
        CharacterStatCurve => "AvatarCurveExcelConfigData",
        CharacterReleaseInfo => "AvatarCodexExcelConfigData",

        // Artifacts
        ArtifactSetBonus => "EquipAffixExcelConfigData",
        ArtifactData => "ReliquaryExcelConfigData",
        ArtifactMainStat => "ReliquaryLevelExcelConfigData",
        ArtifactSubStat => "ReliquaryAffixExcelConfigData",
        ArtifactSetData => "ReliquarySetExcelConfigData",
        ArtifactRarityData => "ReliquaryCodexExcelConfigData",

        // Weapons
        WeaponData => "WeaponExcelConfigData",
        WeaponAscension => "WeaponPromoteExcelConfigData",
        WeaponStatCurve => "WeaponCurveExcelConfigData",
        WeaponReleaseInfo => "WeaponCodexExcelConfigData",

        TextMap => "ManualTextMapConfigData",
        TravelerData => "AvatarHeroEntityExcelConfigData",
        ArchonData => "TrialAvatarFetterDataConfigData",
        MaterialData => "MaterialExcelConfigData",
        FriendshipReward => "FetterCharacterCardExcelConfigData",
        RewardData => "RewardExcelConfigData",
        ProfilePicture => "ProfilePictureExcelConfigData",
        TheaterDifficulty => "RoleCombatDifficultyExcelConfigData",
    }
}
