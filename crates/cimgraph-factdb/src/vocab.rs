//! Well-known namespaces and IRIs.

pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const PROPERTY: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property";
    pub const FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
}

pub mod rdfs {
    pub const NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
}

pub mod sh {
    pub const NS: &str = "http://www.w3.org/ns/shacl#";
}

pub mod cim {
    pub const NS: &str = "http://cloudinformationmodel.org/model/";
}

pub mod xsd {
    pub const NS: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

    const NUMERIC_LOCAL_NAMES: &[&str] = &[
        "integer",
        "decimal",
        "double",
        "float",
        "long",
        "int",
        "short",
        "byte",
        "nonNegativeInteger",
        "nonPositiveInteger",
        "positiveInteger",
        "negativeInteger",
        "unsignedLong",
        "unsignedInt",
        "unsignedShort",
        "unsignedByte",
    ];

    pub fn is_numeric(datatype: &str) -> bool {
        datatype
            .strip_prefix(NS)
            .is_some_and(|local| NUMERIC_LOCAL_NAMES.contains(&local))
    }
}

/// Prefix table installed on every freshly loaded graph.
pub const DEFAULT_PREFIXES: &[(&str, &str)] = &[
    ("cim", cim::NS),
    ("rdf", rdf::NS),
    ("rdfs", rdfs::NS),
    ("sh", sh::NS),
    ("xsd", xsd::NS),
];
