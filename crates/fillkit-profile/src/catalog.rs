//! The fixed set of leaves a canonical profile carries and the raw keys each
//! one is read from.

use crate::leaf::Section;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafKind {
    Text,
    Number,
    Bool,
    List,
    /// Stored as ISO `YYYY-MM-DD` text.
    Date,
}

#[derive(Debug)]
pub struct LeafSpec {
    pub section: Section,
    pub key: &'static str,
    pub kind: LeafKind,
    /// Raw key spellings accepted besides `key`, highest priority first.
    pub aliases: &'static [&'static str],
}

impl LeafSpec {
    pub fn path(&self) -> String {
        format!("{}.{}", self.section.as_str(), self.key)
    }
}

macro_rules! leaf {
    ($section:ident, $key:literal, $kind:ident, [$($alias:literal),* $(,)?]) => {
        LeafSpec {
            section: Section::$section,
            key: $key,
            kind: LeafKind::$kind,
            aliases: &[$($alias),*],
        }
    };
}

pub const LEAF_SPECS: &[LeafSpec] = &[
    // identity
    leaf!(Identity, "title", Text, ["salutation", "honorific", "prefix"]),
    leaf!(Identity, "firstName", Text, ["first_name", "fname", "given", "givenName", "forename"]),
    leaf!(Identity, "middleName", Text, ["middle_name", "middle", "mname"]),
    leaf!(Identity, "lastName", Text, ["last_name", "lname", "surname", "familyName"]),
    leaf!(Identity, "fullName", Text, ["full_name", "name", "displayName"]),
    leaf!(Identity, "preferredName", Text, ["preferred_name", "nickname", "nick"]),
    leaf!(Identity, "gender", Text, ["sex"]),
    leaf!(Identity, "pronouns", Text, []),
    leaf!(Identity, "dateOfBirth", Date, ["dob", "birthDate", "date_of_birth", "birthday"]),
    leaf!(Identity, "birthYear", Number, ["birth_year", "yearOfBirth"]),
    leaf!(Identity, "birthMonth", Number, ["birth_month"]),
    leaf!(Identity, "birthDay", Number, ["birth_day"]),
    leaf!(Identity, "age", Number, []),
    leaf!(Identity, "ageRange", Text, ["age_range", "ageGroup"]),
    leaf!(Identity, "maritalStatus", Text, ["marital_status", "marital", "relationshipStatus", "civilStatus"]),
    // contact
    leaf!(Contact, "email", Text, ["emailAddress", "mail"]),
    leaf!(Contact, "phone", Text, ["phoneNumber", "mobile", "telephone", "tel", "cell"]),
    leaf!(Contact, "linkedin", Text, ["linkedinUrl"]),
    leaf!(Contact, "twitter", Text, ["twitterHandle"]),
    leaf!(Contact, "github", Text, ["githubUsername"]),
    leaf!(Contact, "website", Text, ["personalWebsite", "homepage", "url"]),
    leaf!(Contact, "preferredContact", Text, ["preferred_contact", "contactMethod"]),
    // address
    leaf!(Address, "street", Text, ["address", "streetAddress", "address1", "addressLine1"]),
    leaf!(Address, "apartment", Text, ["apt", "unit", "suite", "address2", "addressLine2"]),
    leaf!(Address, "city", Text, ["town", "locality"]),
    leaf!(Address, "state", Text, ["province", "region", "stateName"]),
    leaf!(Address, "stateCode", Text, ["state_code"]),
    leaf!(Address, "zipCode", Text, ["zip", "postalCode", "postcode"]),
    leaf!(Address, "country", Text, ["countryName", "nation"]),
    leaf!(Address, "countryCode", Text, ["country_code"]),
    // education
    leaf!(Education, "educationLevel", Text, ["education", "education_level", "highestEducation", "degree"]),
    leaf!(Education, "educationCategory", Text, ["education_category"]),
    leaf!(Education, "institution", Text, ["currentInstitution", "school", "university", "college"]),
    leaf!(Education, "graduationYear", Number, ["graduation_year", "gradYear"]),
    leaf!(Education, "gpa", Text, []),
    leaf!(Education, "fieldOfStudy", Text, ["field_of_study", "major", "subject"]),
    // employment
    leaf!(Employment, "employmentStatus", Text, ["employment_status", "workStatus", "employment"]),
    leaf!(Employment, "employmentCategory", Text, ["employment_category"]),
    leaf!(Employment, "company", Text, ["employer", "organization", "organisation", "companyName"]),
    leaf!(Employment, "jobTitle", Text, ["job_title", "position", "role", "occupation"]),
    leaf!(Employment, "industry", Text, ["sector"]),
    leaf!(Employment, "yearsOfExperience", Number, ["years_of_experience", "experience", "experienceYears"]),
    leaf!(Employment, "experienceLevel", Text, ["experience_level", "seniority"]),
    leaf!(Employment, "income", Number, ["salary", "annualIncome", "householdIncome"]),
    leaf!(Employment, "incomeBracket", Text, ["income_bracket", "incomeRange"]),
    leaf!(Employment, "currency", Text, []),
    // skills
    leaf!(Skills, "technicalSkills", List, ["skills", "technical_skills", "techSkills"]),
    leaf!(Skills, "languages", List, ["spokenLanguages"]),
    leaf!(Skills, "primaryLanguage", Text, ["nativeLanguage", "primary_language", "motherTongue"]),
    // preferences
    leaf!(Preferences, "newsletter", Bool, ["subscribeNewsletter", "newsletterOptIn"]),
    leaf!(Preferences, "marketing", Bool, ["marketingOptIn", "marketingEmails", "promotions"]),
    leaf!(Preferences, "notifications", Bool, ["notify", "notificationsEnabled"]),
    leaf!(Preferences, "shareData", Bool, ["share_data", "dataSharing"]),
    leaf!(Preferences, "preferredLanguage", Text, ["preferred_language", "locale"]),
    leaf!(Preferences, "interests", List, ["hobbies", "interest"]),
];

/// Look up a leaf by its `section.key` path.
pub fn spec_for(path: &str) -> Option<&'static LeafSpec> {
    let (section, key) = path.split_once('.')?;
    LEAF_SPECS
        .iter()
        .find(|spec| spec.section.as_str() == section && spec.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn leaf_paths_are_unique() {
        let paths: BTreeSet<String> = LEAF_SPECS.iter().map(LeafSpec::path).collect();
        assert_eq!(paths.len(), LEAF_SPECS.len());
    }

    #[test]
    fn every_section_has_leaves() {
        for section in Section::ALL {
            assert!(
                LEAF_SPECS.iter().any(|spec| spec.section == section),
                "{} has no leaves",
                section.as_str()
            );
        }
    }

    #[test]
    fn spec_lookup_by_path() {
        let spec = spec_for("address.country").expect("country leaf");
        assert_eq!(spec.kind, LeafKind::Text);
        assert!(spec_for("address.planet").is_none());
        assert!(spec_for("country").is_none());
    }
}
