//! `#[waypoint_tool]`: generates a `ToolDyn` impl for a plain function
//! (spec §4.3, design note §9 — "a faithful reimplementation may use
//! compile-time code generation ... instead of runtime reflection").
//!
//! The donor codebase's own `agent-tool-macros::agent_tool` is an
//! acknowledged stub (`// Stub — will be implemented in Task 2.4`); this is
//! that macro, written for spec.md's contract rather than the donor's.
//!
//! A parameter whose type is `ContextVariables` is elided from the
//! generated schema and injected from the live context at call time
//! (spec §4.3). Every other parameter becomes a required schema property
//! keyed by its Rust identifier — the idiomatic stand-in for the
//! `Parameters[param<i>]` positional lookup a reflection-based
//! implementation would use — and must implement
//! `serde::de::DeserializeOwned + Default + schemars::JsonSchema`, since
//! binding falls back to `Default` on any missing or unconvertible field
//! and never fails.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{FnArg, Ident, ItemFn, MetaNameValue, Pat, PatType, Token, Type};

/// Optional `name = "..."` / `description = "..."` overrides, matching the
/// attribute shape the donor's own aspirational derive-macro tests already
/// assume (`#[neuron_tool(name = "echo", description = "Echo text back")]`,
/// in `neuron-tool/tests/derive.rs` — a test file with no macro behind it
/// anywhere in the retrieval pack).
#[derive(Default)]
struct ToolAttrArgs {
    name: Option<String>,
    description: Option<String>,
}

fn parse_attr_args(attr: TokenStream) -> ToolAttrArgs {
    let mut args = ToolAttrArgs::default();
    let Ok(pairs) =
        Punctuated::<MetaNameValue, Token![,]>::parse_terminated.parse(attr)
    else {
        return args;
    };
    for pair in pairs {
        let Some(ident) = pair.path.get_ident() else {
            continue;
        };
        let syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(s),
            ..
        }) = &pair.value
        else {
            continue;
        };
        match ident.to_string().as_str() {
            "name" => args.name = Some(s.value()),
            "description" => args.description = Some(s.value()),
            _ => {}
        }
    }
    args
}

/// See the module documentation.
#[proc_macro_attribute]
pub fn waypoint_tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_args = parse_attr_args(attr);
    let input = syn::parse_macro_input!(item as ItemFn);
    expand(input, attr_args).into()
}

fn expand(input: ItemFn, attr_args: ToolAttrArgs) -> proc_macro2::TokenStream {
    let fn_ident = input.sig.ident.clone();
    let fn_name = attr_args.name.unwrap_or_else(|| fn_ident.to_string());
    let is_async = input.sig.asyncness.is_some();
    let description = attr_args
        .description
        .unwrap_or_else(|| doc_comment(&input.attrs));
    let is_transfer_tool = return_type_mentions_agent_handle(&input.sig.output);

    let mut bindings = Vec::new();
    let mut call_args = Vec::new();
    let mut schema_fields = Vec::new();

    for (index, arg) in input.sig.inputs.iter().enumerate() {
        let FnArg::Typed(PatType { pat, ty, .. }) = arg else {
            continue;
        };
        let param_ident = match pat.as_ref() {
            Pat::Ident(p) => p.ident.clone(),
            _ => format_ident!("__arg{}", index),
        };
        let temp = format_ident!("__bound_{}", param_ident);
        call_args.push(quote! { #temp });

        if is_context_vars_type(ty) {
            bindings.push(quote! {
                let #temp = ::core::clone::Clone::clone(ctx_vars);
            });
            continue;
        }

        let key = param_ident.to_string();
        bindings.push(quote! {
            let #temp: #ty = __args_obj
                .and_then(|o| o.get(#key))
                .cloned()
                .and_then(|v| ::serde_json::from_value(v).ok())
                .unwrap_or_default();
        });
        schema_fields.push(quote! {
            #param_ident: #ty,
        });
    }

    // Identifiers are always derived from the Rust function identifier, never
    // from `fn_name` — a `name = "..."` override is a runtime-visible string
    // and isn't guaranteed to be a valid Rust identifier segment.
    let fn_ident_pascal = to_pascal_case(&fn_ident.to_string());
    let schema_struct_ident = format_ident!("__{}ArgsSchema", fn_ident_pascal);
    let tool_struct_ident = Ident::new(&format!("{fn_ident_pascal}Tool"), Span::call_site());
    let constructor_ident = format_ident!("{}_tool", fn_ident);

    let invoke = if is_async {
        quote! { #fn_ident(#(#call_args),*).await }
    } else {
        quote! { #fn_ident(#(#call_args),*) }
    };

    quote! {
        #input

        #[derive(::schemars::JsonSchema)]
        #[allow(non_camel_case_types, non_snake_case)]
        #[doc(hidden)]
        struct #schema_struct_ident {
            #(#schema_fields)*
        }

        #[doc = "Generated `ToolDyn` implementation; construct via the companion function."]
        pub struct #tool_struct_ident;

        impl ::waypoint_tool::ToolDyn for #tool_struct_ident {
            fn name(&self) -> &str {
                #fn_name
            }

            fn is_transfer_tool(&self) -> bool {
                #is_transfer_tool
            }

            fn description(&self) -> &str {
                #description
            }

            fn input_schema(&self) -> ::serde_json::Value {
                ::serde_json::to_value(::schemars::schema_for!(#schema_struct_ident))
                    .unwrap_or_else(|_| ::serde_json::json!({}))
            }

            fn call<'a>(
                &'a self,
                arguments: &'a str,
                ctx_vars: &'a ::waypoint_tool::ContextVariables,
            ) -> ::waypoint_tool::ToolFuture<'a> {
                ::std::boxed::Box::pin(async move {
                    let __args_value: ::serde_json::Value =
                        ::serde_json::from_str(arguments).unwrap_or(::serde_json::Value::Null);
                    let __args_obj = __args_value.as_object();

                    #(#bindings)*

                    let __result = #invoke;
                    ::waypoint_tool::ToolFnOutput::into_tool_result(__result)
                        .map(|(outcome, context_vars)| ::waypoint_tool::ToolCallResult {
                            outcome,
                            context_vars,
                        })
                        .map_err(::waypoint_tool::ToolCallError)
                })
            }
        }

        #[doc = "Construct the generated tool, ready for `ToolRegistry::register`."]
        pub fn #constructor_ident() -> #tool_struct_ident {
            #tool_struct_ident
        }
    }
}

/// Spec §4.4's partitioning rule keys on "reflected return type implements
/// Agent"; since Rust has no runtime reflection, this recognizes the
/// syntactic shape instead — `AgentHandle`, or `AgentHandle` nested inside
/// a `Result<_, _>` or a `(_, ContextVariables)` tuple, anywhere in the
/// function's declared return type.
fn return_type_mentions_agent_handle(output: &syn::ReturnType) -> bool {
    let syn::ReturnType::Type(_, ty) = output else {
        return false;
    };
    type_mentions_ident(ty, "AgentHandle")
}

fn type_mentions_ident(ty: &Type, ident: &str) -> bool {
    match ty {
        Type::Path(type_path) => type_path.path.segments.iter().any(|segment| {
            if segment.ident == ident {
                return true;
            }
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                args.args.iter().any(|arg| match arg {
                    syn::GenericArgument::Type(t) => type_mentions_ident(t, ident),
                    _ => false,
                })
            } else {
                false
            }
        }),
        Type::Tuple(tuple) => tuple.elems.iter().any(|t| type_mentions_ident(t, ident)),
        Type::Paren(p) => type_mentions_ident(&p.elem, ident),
        Type::Group(g) => type_mentions_ident(&g.elem, ident),
        _ => false,
    }
}

fn is_context_vars_type(ty: &Type) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    type_path
        .path
        .segments
        .last()
        .is_some_and(|segment| segment.ident == "ContextVariables")
}

fn doc_comment(attrs: &[syn::Attribute]) -> String {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let syn::Meta::NameValue(meta) = &attr.meta {
            if let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(s),
                ..
            }) = &meta.value
            {
                lines.push(s.value().trim().to_string());
            }
        }
    }
    lines.join("\n")
}

fn to_pascal_case(input: &str) -> String {
    input
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{return_type_mentions_agent_handle, to_pascal_case};
    use syn::ReturnType;

    #[test]
    fn pascal_cases_snake_case_names() {
        assert_eq!(to_pascal_case("get_weather"), "GetWeather");
        assert_eq!(to_pascal_case("echo"), "Echo");
    }

    fn output_of(sig: &str) -> ReturnType {
        let item: syn::ItemFn = syn::parse_str(&format!("fn f() {sig} {{}}")).unwrap();
        item.sig.output
    }

    #[test]
    fn detects_bare_agent_handle_return() {
        assert!(return_type_mentions_agent_handle(&output_of(
            "-> AgentHandle"
        )));
    }

    #[test]
    fn detects_agent_handle_inside_result_and_tuple() {
        assert!(return_type_mentions_agent_handle(&output_of(
            "-> Result<AgentHandle, String>"
        )));
        assert!(return_type_mentions_agent_handle(&output_of(
            "-> (AgentHandle, ContextVariables)"
        )));
    }

    #[test]
    fn plain_return_types_are_not_transfer_tools() {
        assert!(!return_type_mentions_agent_handle(&output_of("-> String")));
        assert!(!return_type_mentions_agent_handle(&output_of(
            "-> Result<f64, String>"
        )));
    }
}
