//! JSON input schemas advertised for each operation

use serde_json::{json, Value};

fn measure() -> Value {
    json!({"type": "string", "enum": ["OR", "RR", "RD", "SMD", "MD"]})
}

fn model() -> Value {
    json!({"type": "string", "enum": ["fixed", "random"], "default": "fixed"})
}

fn alpha() -> Value {
    json!({"type": "number", "exclusiveMinimum": 0, "exclusiveMaximum": 1})
}

fn study_record() -> Value {
    json!({
        "type": "object",
        "required": ["study_id"],
        "properties": {
            "study_id": {"type": "string"},
            "events_treatment": {"type": "number", "minimum": 0},
            "total_treatment": {"type": "number", "exclusiveMinimum": 0},
            "events_control": {"type": "number", "minimum": 0},
            "total_control": {"type": "number", "exclusiveMinimum": 0},
            "mean_t": {"type": "number"},
            "sd_t": {"type": "number", "exclusiveMinimum": 0},
            "n_t": {"type": "number", "exclusiveMinimum": 0},
            "mean_c": {"type": "number"},
            "sd_c": {"type": "number", "exclusiveMinimum": 0},
            "n_c": {"type": "number", "exclusiveMinimum": 0},
            "treatment": {"type": "string"},
            "comparator": {"type": "string"},
            "covariates": {"type": "object"}
        }
    })
}

fn studies(min_items: usize) -> Value {
    json!({"type": "array", "minItems": min_items, "items": study_record()})
}

pub(crate) fn effect_size() -> Value {
    json!({
        "type": "object",
        "required": ["measure", "studies"],
        "properties": {"measure": measure(), "studies": studies(1)}
    })
}

pub(crate) fn pool() -> Value {
    json!({
        "type": "object",
        "required": ["measure", "studies"],
        "properties": {
            "measure": measure(),
            "model": model(),
            "studies": studies(1),
            "alpha": alpha(),
            "hartung_knapp": {"type": "boolean", "default": false},
            "leave_one_out": {"type": "boolean", "default": false},
            "subgroup_by": {"type": "string"}
        }
    })
}

pub(crate) fn heterogeneity() -> Value {
    json!({
        "type": "object",
        "required": ["measure", "studies"],
        "properties": {"measure": measure(), "studies": studies(2)}
    })
}

pub(crate) fn publication_bias() -> Value {
    json!({
        "type": "object",
        "required": ["measure", "studies"],
        "properties": {
            "measure": measure(),
            "model": model(),
            "studies": studies(1),
            "alpha": alpha(),
            "trim_and_fill": {"type": "boolean", "default": false}
        }
    })
}

fn arm() -> Value {
    json!({
        "type": "object",
        "required": ["treatment"],
        "properties": {
            "treatment": {"type": "string"},
            "events": {"type": "number", "minimum": 0},
            "total": {"type": "number", "exclusiveMinimum": 0},
            "mean": {"type": "number"},
            "sd": {"type": "number", "exclusiveMinimum": 0},
            "n": {"type": "number", "exclusiveMinimum": 0}
        }
    })
}

pub(crate) fn network() -> Value {
    json!({
        "type": "object",
        "required": ["measure", "studies"],
        "properties": {
            "measure": measure(),
            "model": model(),
            "direction": {
                "type": "string",
                "enum": ["higher_is_better", "lower_is_better"],
                "default": "higher_is_better"
            },
            "studies": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "oneOf": [
                        {
                            "type": "object",
                            "required": ["study_id", "arms"],
                            "properties": {
                                "study_id": {"type": "string"},
                                "arms": {"type": "array", "minItems": 2, "items": arm()}
                            }
                        },
                        study_record()
                    ]
                }
            },
            "alpha": alpha(),
            "simulations": {"type": "integer", "minimum": 1},
            "seed": {"type": "integer", "minimum": 0}
        }
    })
}

pub(crate) fn plot() -> Value {
    json!({
        "type": "object",
        "required": ["plot_type"],
        "properties": {
            "plot_type": {
                "type": "string",
                "enum": [
                    "forest", "funnel", "traffic_light", "prisma", "network", "ranking", "league"
                ]
            },
            "order": {"type": "array", "items": {"type": "string"}},
            "judgements": {
                "type": "object",
                "additionalProperties": {
                    "type": "object",
                    "additionalProperties": {
                        "type": "string",
                        "enum": ["low", "some_concerns", "high", "unclear"]
                    }
                }
            },
            "study_order": {"type": "array", "items": {"type": "string"}},
            "domain_order": {"type": "array", "items": {"type": "string"}},
            "counts": {"type": "object"}
        },
        "description": "Remaining fields follow the input of the operation the plot is drawn from"
    })
}
