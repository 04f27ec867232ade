//! Introspection synthesis from a schema-definition document.
//!
//! The query engine only exposes its schema as SDL text; GraphQL clients ask
//! for it as an `IntrospectionQuery` result. This module bridges the two:
//! parse the SDL, merge in the base schema (built-in scalars, root-operation
//! resolution), and emit the `__schema` document as JSON.

use std::collections::HashMap;

use graphql_parser::schema::{
    Definition, Directive, Document, EnumValue, Field, InputValue, Type, TypeDefinition,
    Value as SdlValue,
};
use serde_json::{json, Value};

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

#[derive(Debug, thiserror::Error)]
pub enum IntrospectionError {
    #[error("parse schema definition: {0}")]
    Parse(String),
}

/// Generate the `__schema` introspection document for an SDL text.
pub fn introspect(sdl: &str) -> Result<Value, IntrospectionError> {
    let doc: Document<'_, String> =
        graphql_parser::parse_schema(sdl).map_err(|err| IntrospectionError::Parse(err.to_string()))?;

    let mut kinds: HashMap<String, &'static str> = BUILTIN_SCALARS
        .iter()
        .map(|name| (name.to_string(), "SCALAR"))
        .collect();
    for def in &doc.definitions {
        if let Definition::TypeDefinition(td) = def {
            kinds.insert(type_name(td).to_string(), kind_of(td));
        }
    }

    let mut types = Vec::new();
    for name in BUILTIN_SCALARS {
        // User definitions shadow the base schema.
        let shadowed = doc.definitions.iter().any(
            |def| matches!(def, Definition::TypeDefinition(td) if type_name(td) == name),
        );
        if !shadowed {
            types.push(json!({
                "kind": "SCALAR",
                "name": name,
                "description": null,
                "fields": null,
                "inputFields": null,
                "interfaces": null,
                "enumValues": null,
                "possibleTypes": null,
            }));
        }
    }
    for def in &doc.definitions {
        if let Definition::TypeDefinition(td) = def {
            types.push(type_json(td, &kinds, &doc));
        }
    }

    let mut query_root: Option<String> = None;
    let mut mutation_root: Option<String> = None;
    let mut subscription_root: Option<String> = None;
    for def in &doc.definitions {
        if let Definition::SchemaDefinition(schema) = def {
            query_root = schema.query.clone();
            mutation_root = schema.mutation.clone();
            subscription_root = schema.subscription.clone();
        }
    }
    let defined_object = |name: &str| kinds.get(name).copied() == Some("OBJECT");
    if query_root.is_none() && defined_object("Query") {
        query_root = Some("Query".to_string());
    }
    if mutation_root.is_none() && defined_object("Mutation") {
        mutation_root = Some("Mutation".to_string());
    }
    if subscription_root.is_none() && defined_object("Subscription") {
        subscription_root = Some("Subscription".to_string());
    }

    Ok(json!({
        "__schema": {
            "queryType": query_root.map(|name| json!({ "name": name })),
            "mutationType": mutation_root.map(|name| json!({ "name": name })),
            "subscriptionType": subscription_root.map(|name| json!({ "name": name })),
            "types": types,
            "directives": standard_directives(),
        }
    }))
}

fn type_name<'a>(td: &'a TypeDefinition<'_, String>) -> &'a str {
    match td {
        TypeDefinition::Scalar(t) => &t.name,
        TypeDefinition::Object(t) => &t.name,
        TypeDefinition::Interface(t) => &t.name,
        TypeDefinition::Union(t) => &t.name,
        TypeDefinition::Enum(t) => &t.name,
        TypeDefinition::InputObject(t) => &t.name,
    }
}

fn kind_of(td: &TypeDefinition<'_, String>) -> &'static str {
    match td {
        TypeDefinition::Scalar(_) => "SCALAR",
        TypeDefinition::Object(_) => "OBJECT",
        TypeDefinition::Interface(_) => "INTERFACE",
        TypeDefinition::Union(_) => "UNION",
        TypeDefinition::Enum(_) => "ENUM",
        TypeDefinition::InputObject(_) => "INPUT_OBJECT",
    }
}

fn type_json(
    td: &TypeDefinition<'_, String>,
    kinds: &HashMap<String, &'static str>,
    doc: &Document<'_, String>,
) -> Value {
    match td {
        TypeDefinition::Scalar(t) => json!({
            "kind": "SCALAR",
            "name": t.name,
            "description": t.description,
            "fields": null,
            "inputFields": null,
            "interfaces": null,
            "enumValues": null,
            "possibleTypes": null,
        }),
        TypeDefinition::Object(t) => json!({
            "kind": "OBJECT",
            "name": t.name,
            "description": t.description,
            "fields": t.fields.iter().map(|f| field_json(f, kinds)).collect::<Vec<_>>(),
            "inputFields": null,
            "interfaces": t.implements_interfaces.iter()
                .map(|i| named_ref(i, "INTERFACE"))
                .collect::<Vec<_>>(),
            "enumValues": null,
            "possibleTypes": null,
        }),
        TypeDefinition::Interface(t) => json!({
            "kind": "INTERFACE",
            "name": t.name,
            "description": t.description,
            "fields": t.fields.iter().map(|f| field_json(f, kinds)).collect::<Vec<_>>(),
            "inputFields": null,
            "interfaces": null,
            "enumValues": null,
            "possibleTypes": implementors(&t.name, doc),
        }),
        TypeDefinition::Union(t) => json!({
            "kind": "UNION",
            "name": t.name,
            "description": t.description,
            "fields": null,
            "inputFields": null,
            "interfaces": null,
            "enumValues": null,
            "possibleTypes": t.types.iter()
                .map(|m| named_ref(m, kinds.get(m.as_str()).copied().unwrap_or("OBJECT")))
                .collect::<Vec<_>>(),
        }),
        TypeDefinition::Enum(t) => json!({
            "kind": "ENUM",
            "name": t.name,
            "description": t.description,
            "fields": null,
            "inputFields": null,
            "interfaces": null,
            "enumValues": t.values.iter().map(enum_value_json).collect::<Vec<_>>(),
            "possibleTypes": null,
        }),
        TypeDefinition::InputObject(t) => json!({
            "kind": "INPUT_OBJECT",
            "name": t.name,
            "description": t.description,
            "fields": null,
            "inputFields": t.fields.iter().map(|v| input_value_json(v, kinds)).collect::<Vec<_>>(),
            "interfaces": null,
            "enumValues": null,
            "possibleTypes": null,
        }),
    }
}

fn field_json(field: &Field<'_, String>, kinds: &HashMap<String, &'static str>) -> Value {
    let (is_deprecated, reason) = deprecation(&field.directives);
    json!({
        "name": field.name,
        "description": field.description,
        "args": field.arguments.iter().map(|arg| input_value_json(arg, kinds)).collect::<Vec<_>>(),
        "type": type_ref(&field.field_type, kinds),
        "isDeprecated": is_deprecated,
        "deprecationReason": reason,
    })
}

fn input_value_json(value: &InputValue<'_, String>, kinds: &HashMap<String, &'static str>) -> Value {
    json!({
        "name": value.name,
        "description": value.description,
        "type": type_ref(&value.value_type, kinds),
        "defaultValue": value.default_value.as_ref().map(|v| v.to_string()),
    })
}

fn enum_value_json(value: &EnumValue<'_, String>) -> Value {
    let (is_deprecated, reason) = deprecation(&value.directives);
    json!({
        "name": value.name,
        "description": value.description,
        "isDeprecated": is_deprecated,
        "deprecationReason": reason,
    })
}

fn type_ref(ty: &Type<'_, String>, kinds: &HashMap<String, &'static str>) -> Value {
    match ty {
        Type::NamedType(name) => json!({
            "kind": kinds.get(name.as_str()).copied().unwrap_or("OBJECT"),
            "name": name,
            "ofType": null,
        }),
        Type::ListType(inner) => json!({
            "kind": "LIST",
            "name": null,
            "ofType": type_ref(inner, kinds),
        }),
        Type::NonNullType(inner) => json!({
            "kind": "NON_NULL",
            "name": null,
            "ofType": type_ref(inner, kinds),
        }),
    }
}

fn named_ref(name: &str, kind: &str) -> Value {
    json!({ "kind": kind, "name": name, "ofType": null })
}

fn implementors(interface: &str, doc: &Document<'_, String>) -> Value {
    let refs: Vec<Value> = doc
        .definitions
        .iter()
        .filter_map(|def| match def {
            Definition::TypeDefinition(TypeDefinition::Object(object))
                if object.implements_interfaces.iter().any(|i| i.as_str() == interface) =>
            {
                Some(named_ref(&object.name, "OBJECT"))
            }
            _ => None,
        })
        .collect();
    Value::Array(refs)
}

fn deprecation(directives: &[Directive<'_, String>]) -> (bool, Value) {
    for directive in directives {
        if directive.name == "deprecated" {
            let reason = directive
                .arguments
                .iter()
                .find(|(name, _)| name.as_str() == "reason")
                .map(|(_, value)| match value {
                    SdlValue::String(s) => Value::String(s.clone()),
                    other => Value::String(other.to_string()),
                })
                .unwrap_or(Value::Null);
            return (true, reason);
        }
    }
    (false, Value::Null)
}

fn standard_directives() -> Value {
    let condition_arg = |description: &str| {
        json!({
            "name": "if",
            "description": description,
            "type": {
                "kind": "NON_NULL",
                "name": null,
                "ofType": { "kind": "SCALAR", "name": "Boolean", "ofType": null },
            },
            "defaultValue": null,
        })
    };
    json!([
        {
            "name": "include",
            "description": "Directs the executor to include this field or fragment only when the `if` argument is true.",
            "locations": ["FIELD", "FRAGMENT_SPREAD", "INLINE_FRAGMENT"],
            "args": [condition_arg("Included when true.")],
        },
        {
            "name": "skip",
            "description": "Directs the executor to skip this field or fragment when the `if` argument is true.",
            "locations": ["FIELD", "FRAGMENT_SPREAD", "INLINE_FRAGMENT"],
            "args": [condition_arg("Skipped when true.")],
        },
        {
            "name": "deprecated",
            "description": "Marks an element of a GraphQL schema as no longer supported.",
            "locations": ["FIELD_DEFINITION", "ENUM_VALUE"],
            "args": [{
                "name": "reason",
                "description": "Explains why this element was deprecated.",
                "type": { "kind": "SCALAR", "name": "String", "ofType": null },
                "defaultValue": "\"No longer supported\"",
            }],
        },
    ])
}
