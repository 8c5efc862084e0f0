use serde::{Deserialize, Serialize};

/// One object field as reported by the describe phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field API name
    pub name: String,

    /// Object the field is declared on
    pub object: String,

    /// Wire type (string, double, boolean, reference, ...)
    #[serde(default)]
    pub field_type: String,

    #[serde(default = "default_true")]
    pub updateable: bool,

    #[serde(default = "default_true")]
    pub creatable: bool,

    #[serde(default)]
    pub calculated: bool,

    #[serde(default)]
    pub autonumber: bool,

    #[serde(default)]
    pub custom: bool,

    /// True when this field is a foreign key
    #[serde(default)]
    pub is_reference: bool,

    /// Object the foreign key points at; non-empty whenever `is_reference`
    #[serde(default)]
    pub referenced_object: String,

    /// Parent deletion cascades into rows holding this reference
    #[serde(default)]
    pub cascade_delete: bool,
}

fn default_true() -> bool {
    true
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object: object.into(),
            field_type: "string".to_string(),
            updateable: true,
            creatable: true,
            calculated: false,
            autonumber: false,
            custom: false,
            is_reference: false,
            referenced_object: String::new(),
            cascade_delete: false,
        }
    }

    pub fn reference(
        name: impl Into<String>,
        object: impl Into<String>,
        referenced_object: impl Into<String>,
    ) -> Self {
        let mut f = Self::new(name, object);
        f.field_type = "reference".to_string();
        f.is_reference = true;
        f.referenced_object = referenced_object.into();
        f
    }

    /// A field we can never write back
    pub fn is_readonly(&self) -> bool {
        !(self.creatable && !self.calculated && !self.autonumber)
    }

    /// Master-detail: the child cannot exist without the parent
    pub fn is_master_detail(&self) -> bool {
        self.is_reference && (!self.updateable || self.cascade_delete)
    }

    /// Relationship path prefix used for the foreign-key companion column,
    /// e.g. `AccountId` -> `Account`, `Custom__c` -> `Custom__r`
    pub fn relationship_name(&self) -> String {
        if let Some(stripped) = self.name.strip_suffix("__c") {
            format!("{}__r", stripped)
        } else if let Some(stripped) = self.name.strip_suffix("Id") {
            stripped.to_string()
        } else {
            self.name.clone()
        }
    }
}
