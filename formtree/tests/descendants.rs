use formtree::FormSchema;
use serde_json::json;

fn ids_of(schema: &FormSchema, id: &str) -> Vec<String> {
    schema.node(id).unwrap().subtree_ids()
}

#[test]
fn test_plain_field_is_its_own_subtree() {
    let schema = FormSchema::from_value(&json!({ "name": { "kind": "text" } })).unwrap();
    assert_eq!(ids_of(&schema, "name"), vec!["name"]);
}

#[test]
fn test_chips_owns_its_textarea_companion() {
    let schema = FormSchema::from_value(&json!({ "tags": { "kind": "chips" } })).unwrap();
    assert_eq!(ids_of(&schema, "tags"), vec!["tags", "tags-textarea"]);
}

#[test]
fn test_group_children_recurse() {
    let schema = FormSchema::from_value(&json!({
        "address": {
            "kind": "group",
            "children": {
                "street": { "kind": "text" },
                "more": {
                    "kind": "group",
                    "children": { "floor": { "kind": "number" } }
                }
            }
        }
    }))
    .unwrap();

    let mut ids = ids_of(&schema, "address");
    ids.sort();
    assert_eq!(ids, vec!["address", "floor", "more", "street"]);
}

#[test]
fn test_option_embedded_subtrees_are_found() {
    // checkbox options smuggle sub-trees outside the generic children key
    let schema = FormSchema::from_value(&json!({
        "extras": {
            "kind": "checkbox",
            "options": [
                {
                    "value": "shipping",
                    "children": {
                        "address": {
                            "kind": "group",
                            "children": { "zip": { "kind": "text" } }
                        }
                    }
                },
                {
                    "value": "gift",
                    "children": { "note": { "kind": "chips" } }
                }
            ]
        }
    }))
    .unwrap();

    let mut ids = ids_of(&schema, "extras");
    ids.sort();
    assert_eq!(
        ids,
        vec!["address", "extras", "note", "note-textarea", "zip"]
    );
}

#[test]
fn test_deeply_nested_options_inside_options() {
    let schema = FormSchema::from_value(&json!({
        "outer": {
            "kind": "radio",
            "options": [{
                "value": "a",
                "children": {
                    "inner": {
                        "kind": "radio",
                        "options": [{
                            "value": "b",
                            "children": { "leaf": { "kind": "text" } }
                        }]
                    }
                }
            }]
        }
    }))
    .unwrap();

    let mut ids = ids_of(&schema, "outer");
    ids.sort();
    assert_eq!(ids, vec!["inner", "leaf", "outer"]);
}

#[test]
fn test_nodes_walk_covers_option_children() {
    let schema = FormSchema::from_value(&json!({
        "contact": {
            "kind": "radio",
            "options": [
                { "value": "email", "children": { "address": { "kind": "text" } } }
            ]
        },
        "name": { "kind": "text" }
    }))
    .unwrap();

    let ids: Vec<&str> = schema.nodes().iter().map(|n| n.id.as_str()).collect();
    assert!(ids.contains(&"contact"));
    assert!(ids.contains(&"address"));
    assert!(ids.contains(&"name"));
    // parents come before their descendants
    let contact = ids.iter().position(|id| *id == "contact").unwrap();
    let address = ids.iter().position(|id| *id == "address").unwrap();
    assert!(contact < address);
}
