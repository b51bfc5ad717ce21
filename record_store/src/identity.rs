use lambda_http::request::RequestContext;
use lambda_http::{Request, RequestExt};
use serde_json::Value;

const COGNITO_SIGN_IN_MARKER: &str = ":CognitoSignIn:";

/// Resolves the calling user's owner identifier from the request context,
/// preferring the Cognito identity id, then the user-pool subject embedded
/// in the authentication-provider string, then token-authorizer output.
/// Returns None when nothing applies; callers treat that as unauthorized.
pub fn owner_id(event: &Request) -> Option<String> {
    match event.request_context() {
        RequestContext::ApiGatewayV1(ctx) => {
            if let Some(identity_id) = ctx.identity.cognito_identity_id {
                if !identity_id.is_empty() {
                    return Some(identity_id);
                }
            }
            if let Some(provider) = ctx.identity.cognito_authentication_provider {
                if let Some(sub) = sign_in_sub(&provider) {
                    return Some(sub.to_string());
                }
            }
            match ctx.authorizer.get("claims") {
                Some(Value::Object(claims)) => match claims.get("sub") {
                    Some(Value::String(sub)) => Some(sub.to_string()),
                    _ => None,
                },
                _ => match ctx.authorizer.get("principalId") {
                    Some(Value::String(principal)) => Some(principal.to_string()),
                    _ => None,
                },
            }
        }
        _ => None,
    }
}

// The provider string looks like
// "cognito-idp.us-east-1.amazonaws.com/us-east-1_AbCdEfGh,
//  cognito-idp.us-east-1.amazonaws.com/us-east-1_AbCdEfGh:CognitoSignIn:<sub>".
fn sign_in_sub(provider: &str) -> Option<&str> {
    let (_, sub) = provider.rsplit_once(COGNITO_SIGN_IN_MARKER)?;
    if sub.is_empty() {
        None
    } else {
        Some(sub)
    }
}
